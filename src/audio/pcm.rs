use std::{
    io::Write as _,
    process::{Command, Stdio},
};

use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate all audio is decoded to before mixing.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
pub const MIX_CHANNELS: u16 = 2;

/// Interleaved `f32` PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct Pcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl Pcm {
    pub fn new(sample_rate: u32, channels: u16, interleaved_f32: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved_f32,
        }
    }

    pub fn silent(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self::new(
            sample_rate,
            channels,
            vec![0.0; frames * usize::from(channels)],
        )
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_secs() * 1000.0
    }

    /// Frame count spanning `ms` milliseconds at this buffer's sample rate.
    pub fn ms_to_frames(&self, ms: u64) -> usize {
        ((u128::from(ms) * u128::from(self.sample_rate)) / 1000) as usize
    }

    pub fn same_format(&self, other: &Pcm) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }

    /// Append `other` directly after this buffer, with no gap or cross-fade.
    pub fn append(&mut self, other: &Pcm) -> ReelResult<()> {
        if !self.same_format(other) {
            return Err(ReelError::audio(format!(
                "cannot append {} Hz/{} ch audio to {} Hz/{} ch audio",
                other.sample_rate, other.channels, self.sample_rate, self.channels
            )));
        }
        self.interleaved_f32
            .extend_from_slice(&other.interleaved_f32);
        Ok(())
    }

    pub fn to_f32le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::<u8>::with_capacity(self.interleaved_f32.len() * 4);
        for &sample in &self.interleaved_f32 {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    pub fn from_f32le_bytes(sample_rate: u32, channels: u16, bytes: &[u8]) -> ReelResult<Self> {
        if !bytes.len().is_multiple_of(4) {
            return Err(ReelError::audio(
                "decoded audio byte length is not aligned to f32 samples",
            ));
        }
        let mut pcm = Vec::<f32>::with_capacity(bytes.len() / 4);
        for chunk in bytes.chunks_exact(4) {
            pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        Ok(Self::new(sample_rate, channels, pcm))
    }
}

/// Converts between encoded audio bytes and [`Pcm`].
pub trait AudioCodec {
    fn decode(&self, encoded: &[u8]) -> ReelResult<Pcm>;
    fn encode(&self, pcm: &Pcm) -> ReelResult<Vec<u8>>;
    /// File extension of the encoded form, without the dot.
    fn extension(&self) -> &'static str;
}

/// Codec backed by the system `ffmpeg` binary. Decodes anything ffmpeg reads; encodes MP3.
#[derive(Clone, Debug)]
pub struct FfmpegCodec {
    pub sample_rate: u32,
    pub channels: u16,
    pub mp3_bitrate: String,
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self {
            sample_rate: MIX_SAMPLE_RATE,
            channels: MIX_CHANNELS,
            mp3_bitrate: "192k".to_string(),
        }
    }
}

impl AudioCodec for FfmpegCodec {
    fn decode(&self, encoded: &[u8]) -> ReelResult<Pcm> {
        let out = run_ffmpeg_piped(
            &[
                "-v",
                "error",
                "-i",
                "pipe:0",
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                &self.channels.to_string(),
                "-ar",
                &self.sample_rate.to_string(),
                "pipe:1",
            ],
            encoded.to_vec(),
        )
        .map_err(|e| ReelError::audio(format!("ffmpeg audio decode failed: {e}")))?;

        Pcm::from_f32le_bytes(self.sample_rate, self.channels, &out)
    }

    fn encode(&self, pcm: &Pcm) -> ReelResult<Vec<u8>> {
        if pcm.sample_rate == 0 || pcm.channels == 0 {
            return Err(ReelError::validation(
                "audio sample_rate/channels must be non-zero for encoding",
            ));
        }
        run_ffmpeg_piped(
            &[
                "-v",
                "error",
                "-f",
                "f32le",
                "-ar",
                &pcm.sample_rate.to_string(),
                "-ac",
                &pcm.channels.to_string(),
                "-i",
                "pipe:0",
                "-c:a",
                "libmp3lame",
                "-b:a",
                &self.mp3_bitrate,
                "-f",
                "mp3",
                "pipe:1",
            ],
            pcm.to_f32le_bytes(),
        )
        .map_err(|e| ReelError::audio(format!("ffmpeg audio encode failed: {e}")))
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }
}

/// In-memory codec whose encoded form is raw interleaved `f32le`. For tests and debugging.
#[derive(Clone, Debug)]
pub struct RawPcmCodec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for RawPcmCodec {
    fn default() -> Self {
        Self {
            sample_rate: MIX_SAMPLE_RATE,
            channels: MIX_CHANNELS,
        }
    }
}

impl AudioCodec for RawPcmCodec {
    fn decode(&self, encoded: &[u8]) -> ReelResult<Pcm> {
        Pcm::from_f32le_bytes(self.sample_rate, self.channels, encoded)
    }

    fn encode(&self, pcm: &Pcm) -> ReelResult<Vec<u8>> {
        if pcm.sample_rate != self.sample_rate || pcm.channels != self.channels {
            return Err(ReelError::audio("raw codec format mismatch"));
        }
        Ok(pcm.to_f32le_bytes())
    }

    fn extension(&self) -> &'static str {
        "f32le"
    }
}

/// Run `ffmpeg` with `input` on stdin and return its stdout.
///
/// stdin is fed from a separate thread so a large input cannot deadlock against a full stdout
/// pipe.
fn run_ffmpeg_piped(args: &[&str], input: Vec<u8>) -> ReelResult<Vec<u8>> {
    let mut child = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            ReelError::audio(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ReelError::audio("failed to open ffmpeg stdin (unexpected)"))?;
    let feeder = std::thread::spawn(move || stdin.write_all(&input));

    let out = child
        .wait_with_output()
        .map_err(|e| ReelError::audio(format!("failed to wait for ffmpeg to finish: {e}")))?;
    let fed = feeder
        .join()
        .map_err(|_| ReelError::audio("ffmpeg stdin feeder thread panicked"))?;

    if !out.status.success() {
        return Err(ReelError::audio(format!(
            "ffmpeg exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    fed.map_err(|e| ReelError::audio(format!("failed to write audio to ffmpeg stdin: {e}")))?;

    Ok(out.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_math_is_exact_at_48k() {
        let pcm = Pcm::silent(48_000, 2, 48_000 * 3 / 2);
        assert_eq!(pcm.frames(), 72_000);
        assert!((pcm.duration_ms() - 1500.0).abs() < 1e-9);
        assert_eq!(pcm.ms_to_frames(1000), 48_000);
        assert_eq!(pcm.ms_to_frames(500), 24_000);
    }

    #[test]
    fn append_rejects_format_mismatch() {
        let mut a = Pcm::silent(48_000, 2, 10);
        let b = Pcm::silent(44_100, 2, 10);
        assert!(a.append(&b).is_err());

        let c = Pcm::new(48_000, 2, vec![0.5; 4]);
        a.append(&c).unwrap();
        assert_eq!(a.frames(), 12);
        assert_eq!(a.interleaved_f32[20..], [0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn raw_codec_round_trips_samples() {
        let codec = RawPcmCodec::default();
        let pcm = Pcm::new(48_000, 2, vec![0.25, -0.5, 1.0, 0.0]);
        let bytes = codec.encode(&pcm).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(codec.decode(&bytes).unwrap(), pcm);
        assert!(codec.decode(&bytes[..15]).is_err());
    }
}
