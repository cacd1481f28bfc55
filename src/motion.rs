//! Ken Burns motion: a linear zoom over a still image, center-cropped to the canvas.

use image::RgbImage;
use rand::RngCore;
use rayon::prelude::*;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionEffect {
    ZoomIn,
    ZoomOut,
}

impl MotionEffect {
    /// Uniform choice between zoom in and zoom out.
    pub fn choose(rng: &mut dyn RngCore) -> Self {
        use rand::Rng as _;
        if rng.gen_bool(0.5) {
            Self::ZoomIn
        } else {
            Self::ZoomOut
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
        }
    }
}

/// Zoom range for both effects. `min` must be >= 1.0 so the crop never leaves the image.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: 1.00,
            max: 1.07,
        }
    }
}

impl ZoomRange {
    pub fn validate(self) -> ReelResult<()> {
        if !(self.min >= 1.0 && self.max >= self.min && self.max.is_finite()) {
            return Err(ReelError::validation(format!(
                "zoom range must satisfy 1.0 <= min <= max (got {}..{})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    fn endpoints(self, effect: MotionEffect) -> (f64, f64) {
        match effect {
            MotionEffect::ZoomIn => (self.min, self.max),
            MotionEffect::ZoomOut => (self.max, self.min),
        }
    }
}

/// One scene's still image animated over a fixed duration.
#[derive(Clone, Debug)]
pub struct KenBurnsClip<'a> {
    image: &'a RgbImage,
    effect: MotionEffect,
    duration_secs: f64,
    zoom: ZoomRange,
}

impl<'a> KenBurnsClip<'a> {
    /// `image` must already be normalized to the output canvas size.
    pub fn new(
        image: &'a RgbImage,
        effect: MotionEffect,
        duration_secs: f64,
        zoom: ZoomRange,
    ) -> ReelResult<Self> {
        zoom.validate()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(ReelError::image("cannot animate an empty image"));
        }
        Ok(Self {
            image,
            effect,
            duration_secs,
            zoom,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn effect(&self) -> MotionEffect {
        self.effect
    }

    /// Zoom factor at local time `t`, clamped to the clip.
    pub fn scale_at(&self, t: f64) -> f64 {
        let (start, end) = self.zoom.endpoints(self.effect);
        let progress = if self.duration_secs > 0.0 {
            (t / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        start + (end - start) * progress
    }

    /// Render the frame at local time `t` as tightly packed RGB8, `canvas` sized.
    pub fn render_rgb(&self, t: f64, canvas: Canvas, out: &mut [u8]) -> ReelResult<()> {
        let (w, h) = (canvas.width as usize, canvas.height as usize);
        if out.len() != w * h * 3 {
            return Err(ReelError::validation(
                "frame buffer size mismatch with width*height*3",
            ));
        }
        if self.image.width() != canvas.width || self.image.height() != canvas.height {
            return Err(ReelError::image(format!(
                "scene image is {}x{}, expected normalized {}x{}",
                self.image.width(),
                self.image.height(),
                canvas.width,
                canvas.height
            )));
        }

        let scale = self.scale_at(t);
        let src = self.image;
        let cx = w as f64 / 2.0;
        let cy = h as f64 / 2.0;

        // Scaling by `scale` about the center and cropping back to the canvas maps each output
        // pixel center to a source point `1/scale` closer to the center.
        out.par_chunks_mut(w * 3).enumerate().for_each(|(y, row)| {
            let sy = (y as f64 + 0.5 - cy) / scale + cy - 0.5;
            for x in 0..w {
                let sx = (x as f64 + 0.5 - cx) / scale + cx - 0.5;
                let px = sample_bilinear(src, sx, sy);
                row[x * 3..x * 3 + 3].copy_from_slice(&px);
            }
        });
        Ok(())
    }
}

fn sample_bilinear(img: &RgbImage, x: f64, y: f64) -> [u8; 3] {
    let max_x = (img.width() - 1) as f64;
    let max_y = (img.height() - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);
    let fx = x - f64::from(x0);
    let fy = y - f64::from(y0);

    let p00 = img.get_pixel(x0, y0).0;
    let p10 = img.get_pixel(x1, y0).0;
    let p01 = img.get_pixel(x0, y1).0;
    let p11 = img.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = f64::from(p00[c]) + (f64::from(p10[c]) - f64::from(p00[c])) * fx;
        let bottom = f64::from(p01[c]) + (f64::from(p11[c]) - f64::from(p01[c])) * fx;
        out[c] = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
