use std::path::{Path, PathBuf};

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Sole audio track of the output, as raw PCM on disk.
    pub audio: Option<AudioInputConfig>,
    /// Hard cap on the container duration; anything past it is trimmed.
    pub duration_secs: Option<f64>,
}

impl SinkConfig {
    /// Byte length of one tightly packed RGB8 frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Raw interleaved `f32le` PCM input.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Consumes RGB8 frames in strictly increasing [`FrameIndex`] order.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, rgb: &[u8]) -> ReelResult<()>;
    /// Called once after the last frame. The output exists only if this returns `Ok`.
    fn end(&mut self) -> ReelResult<()>;
    /// Give up after a failure between `begin` and `end`, discarding partial output.
    fn abort(&mut self) {}
}

/// Hands out the sink that writes the video at `out_path`.
///
/// The output name depends on how many scenes survive, so the pipeline opens its sink late.
pub trait VideoTarget {
    fn open(&mut self, out_path: &Path) -> ReelResult<&mut dyn FrameSink>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Vec<u8>)>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[(FrameIndex, Vec<u8>)] {
        &self.frames
    }

    /// `true` once `end` has succeeded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, rgb: &[u8]) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encode("in-memory sink not started"))?;
        if rgb.len() != cfg.frame_len() {
            return Err(ReelError::validation(
                "frame size mismatch with width*height*3",
            ));
        }
        self.frames.push((idx, rgb.to_vec()));
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.finished = false;
    }
}

impl VideoTarget for InMemorySink {
    fn open(&mut self, _out_path: &Path) -> ReelResult<&mut dyn FrameSink> {
        Ok(self)
    }
}
