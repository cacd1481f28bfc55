use std::path::Path;

use anyhow::Context;
use image::{RgbImage, imageops::FilterType};

use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

/// Decode `bytes` and fit the image to exactly `canvas`: center-crop to the canvas aspect ratio,
/// then resize.
///
/// Generated images are not trusted to honor the requested aspect ratio, so this always runs.
pub fn normalize_to_canvas(bytes: &[u8], canvas: Canvas) -> ReelResult<RgbImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    fit_to_canvas(dyn_img.to_rgb8(), canvas)
}

/// Load an image from disk, refitting it if it is not already canvas sized.
pub fn load_normalized(path: &Path, canvas: Canvas) -> ReelResult<RgbImage> {
    let dyn_img =
        image::open(path).with_context(|| format!("open image '{}'", path.display()))?;
    let rgb = dyn_img.to_rgb8();
    if rgb.dimensions() == (canvas.width, canvas.height) {
        return Ok(rgb);
    }
    fit_to_canvas(rgb, canvas)
}

pub fn save_jpeg(img: &RgbImage, path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create image directory '{}'", parent.display()))?;
    }
    img.save_with_format(path, image::ImageFormat::Jpeg)
        .with_context(|| format!("write jpeg '{}'", path.display()))?;
    Ok(())
}

fn fit_to_canvas(rgb: RgbImage, canvas: Canvas) -> ReelResult<RgbImage> {
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return Err(ReelError::image("decoded image has zero size"));
    }

    let (x, y, cw, ch) = center_crop_rect(w, h, canvas.aspect());
    let cropped = image::imageops::crop_imm(&rgb, x, y, cw, ch).to_image();
    Ok(image::imageops::resize(
        &cropped,
        canvas.width,
        canvas.height,
        FilterType::Lanczos3,
    ))
}

/// Largest centered `(x, y, width, height)` rect of `w`x`h` with the target aspect.
fn center_crop_rect(w: u32, h: u32, target_aspect: f64) -> (u32, u32, u32, u32) {
    let src_aspect = f64::from(w) / f64::from(h);
    if src_aspect > target_aspect {
        let new_w = ((f64::from(h) * target_aspect) as u32).clamp(1, w);
        ((w - new_w) / 2, 0, new_w, h)
    } else {
        let new_h = ((f64::from(w) / target_aspect) as u32).clamp(1, h);
        (0, (h - new_h) / 2, w, new_h)
    }
}
