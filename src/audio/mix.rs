use std::path::Path;

use tracing::debug;

use crate::audio::pcm::{AudioCodec, Pcm};
use crate::foundation::error::{ReelError, ReelResult};
use crate::speech::NarrationTrack;

/// Fixed mixing parameters for the narration/music mix.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MixParams {
    /// Gain applied to the music bed, in dB.
    pub music_gain_db: f32,
    /// How far the music bed extends past the end of the narration.
    pub pad_ms: u64,
    /// Linear fade-out window at the end of the (truncated) music bed.
    pub fade_out_ms: u64,
    /// Silence appended after the mix.
    pub trailing_silence_ms: u64,
}

impl Default for MixParams {
    fn default() -> Self {
        Self {
            music_gain_db: -15.0,
            pad_ms: 1000,
            fade_out_ms: 1000,
            trailing_silence_ms: 500,
        }
    }
}

impl MixParams {
    /// Total length added on top of the narration: pad plus trailing silence.
    pub fn added_ms(&self) -> u64 {
        self.pad_ms + self.trailing_silence_ms
    }
}

/// Narration overlaid on the music bed, followed by trailing silence.
#[derive(Clone, Debug)]
pub struct MixedTrack {
    pub pcm: Pcm,
}

impl MixedTrack {
    pub fn duration_secs(&self) -> f64 {
        self.pcm.duration_secs()
    }

    pub fn duration_ms(&self) -> f64 {
        self.pcm.duration_ms()
    }

    /// Encode with `codec` and write to `path`.
    pub fn write_to(&self, codec: &dyn AudioCodec, path: &Path) -> ReelResult<()> {
        use anyhow::Context as _;

        let bytes = codec.encode(&self.pcm)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create audio output directory '{}'", parent.display())
            })?;
        }
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write mixed audio file '{}'", path.display()))?;
        Ok(())
    }
}

pub struct AudioMixer<'a> {
    codec: &'a dyn AudioCodec,
    params: MixParams,
}

impl<'a> AudioMixer<'a> {
    pub fn new(codec: &'a dyn AudioCodec, params: MixParams) -> Self {
        Self { codec, params }
    }

    /// Decode the narration and mix it over `music`.
    pub fn mix(&self, narration: &NarrationTrack, music: &Pcm) -> ReelResult<MixedTrack> {
        let voice = self.codec.decode(&narration.encoded)?;
        debug!(
            voice_ms = voice.duration_ms(),
            music_ms = music.duration_ms(),
            "mixing narration over music bed"
        );
        mix_voice_over_music(&voice, music, &self.params)
    }
}

/// Mix `voice` over `music`. The result is always `len(voice) + pad + trailing silence` long.
pub fn mix_voice_over_music(voice: &Pcm, music: &Pcm, params: &MixParams) -> ReelResult<MixedTrack> {
    if !voice.same_format(music) {
        return Err(ReelError::audio(format!(
            "narration ({} Hz/{} ch) and music ({} Hz/{} ch) formats differ",
            voice.sample_rate, voice.channels, music.sample_rate, music.channels
        )));
    }
    if voice.channels == 0 || voice.sample_rate == 0 {
        return Err(ReelError::audio("narration has no channels or sample rate"));
    }

    let bed_frames = voice.frames() + voice.ms_to_frames(params.pad_ms);
    let mut bed = loop_to_at_least(music, bed_frames)?;
    truncate_frames(&mut bed, bed_frames);
    apply_gain(&mut bed, db_to_gain(params.music_gain_db));
    let fade_frames = bed.ms_to_frames(params.fade_out_ms);
    fade_out_tail(&mut bed, fade_frames);

    overlay_at_start(&mut bed, voice);

    let silence = Pcm::silent(
        bed.sample_rate,
        bed.channels,
        bed.ms_to_frames(params.trailing_silence_ms),
    );
    bed.append(&silence)?;

    Ok(MixedTrack { pcm: bed })
}

pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Repeat the whole of `music` until it is at least `min_frames` long.
pub fn loop_to_at_least(music: &Pcm, min_frames: usize) -> ReelResult<Pcm> {
    let src_frames = music.frames();
    if src_frames >= min_frames {
        return Ok(music.clone());
    }
    if src_frames == 0 {
        return Err(ReelError::audio("music bed is empty and cannot be looped"));
    }

    let repeats = min_frames / src_frames + 1;
    let mut out = Vec::with_capacity(music.interleaved_f32.len() * repeats);
    for _ in 0..repeats {
        out.extend_from_slice(&music.interleaved_f32);
    }
    Ok(Pcm::new(music.sample_rate, music.channels, out))
}

pub fn truncate_frames(pcm: &mut Pcm, frames: usize) {
    pcm.interleaved_f32
        .truncate(frames * usize::from(pcm.channels));
}

fn apply_gain(pcm: &mut Pcm, gain: f32) {
    for s in &mut pcm.interleaved_f32 {
        *s *= gain;
    }
}

/// Linear fade to silence over the last `fade_frames` frames.
fn fade_out_tail(pcm: &mut Pcm, fade_frames: usize) {
    let frames = pcm.frames();
    if fade_frames == 0 || frames == 0 {
        return;
    }
    let channels = usize::from(pcm.channels);
    let start = frames.saturating_sub(fade_frames);
    for frame in start..frames {
        let remaining = frames - 1 - frame;
        let gain = (remaining as f32 / fade_frames as f32).clamp(0.0, 1.0);
        for s in &mut pcm.interleaved_f32[frame * channels..(frame + 1) * channels] {
            *s *= gain;
        }
    }
}

/// Sum `top` into `base` from frame 0. `top` is cut at the end of `base`.
fn overlay_at_start(base: &mut Pcm, top: &Pcm) {
    for (b, t) in base.interleaved_f32.iter_mut().zip(&top.interleaved_f32) {
        *b = (*b + *t).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::RawPcmCodec;

    const SR: u32 = 1_000;

    fn constant(frames: usize, v: f32) -> Pcm {
        Pcm::new(SR, 2, vec![v; frames * 2])
    }

    #[test]
    fn mixed_length_is_voice_plus_1500ms() {
        let params = MixParams::default();
        for (voice_ms, music_ms) in [(9_000, 2_500), (500, 60_000), (3_000, 4_000), (0, 700)] {
            let voice = constant(voice_ms, 0.1);
            let music = constant(music_ms, 0.2);
            let mixed = mix_voice_over_music(&voice, &music, &params).unwrap();
            assert_eq!(mixed.pcm.frames(), voice_ms + 1_500, "voice={voice_ms} music={music_ms}");
            assert!((mixed.duration_ms() - (voice_ms as f64 + 1_500.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn short_music_is_looped_then_truncated_exactly() {
        let music = Pcm::new(SR, 1, (0..300).map(|i| i as f32).collect());
        let looped = loop_to_at_least(&music, 1_000).unwrap();
        assert!(looped.frames() >= 1_000);
        assert_eq!(looped.frames(), 1_200);
        // Whole-segment repetition.
        assert_eq!(looped.interleaved_f32[300], 0.0);
        assert_eq!(looped.interleaved_f32[599], 299.0);

        let mut bed = looped;
        truncate_frames(&mut bed, 1_000);
        assert_eq!(bed.frames(), 1_000);
    }

    #[test]
    fn empty_music_cannot_be_looped() {
        let music = Pcm::new(SR, 2, Vec::new());
        assert!(loop_to_at_least(&music, 10).is_err());
        // Nothing to loop when none is required.
        assert!(loop_to_at_least(&music, 0).is_ok());
    }

    #[test]
    fn music_is_attenuated_faded_and_voice_untouched() {
        let params = MixParams::default();
        let voice = constant(2_000, 0.5);
        let music = constant(10_000, 1.0);
        let mixed = mix_voice_over_music(&voice, &music, &params).unwrap();
        let s = &mixed.pcm.interleaved_f32;
        let gain = db_to_gain(-15.0);

        // Frame 0: full voice + attenuated music, no fade on either.
        assert!((s[0] - (0.5 + gain)).abs() < 1e-6);
        // Frame 2000 is the pad region start: music only, before the fade window.
        assert!((s[2_000 * 2] - gain * 1.0).abs() < 1e-3);
        // Last bed frame is fully faded.
        assert!(s[(2_999) * 2].abs() < 1e-6);
        // Trailing silence.
        assert!(s[3_000 * 2..].iter().all(|v| *v == 0.0));
        assert_eq!(mixed.pcm.frames(), 3_500);
    }

    #[test]
    fn fade_is_linear_over_window() {
        let mut pcm = constant(2_000, 1.0);
        fade_out_tail(&mut pcm, 1_000);
        let at = |f: usize| pcm.interleaved_f32[f * 2];
        assert_eq!(at(999), 1.0);
        assert!((at(1_499) - 0.5).abs() < 0.01);
        assert_eq!(at(1_999), 0.0);
    }

    #[test]
    fn format_mismatch_is_an_error() {
        let voice = constant(100, 0.1);
        let music = Pcm::new(SR * 2, 2, vec![0.0; 400]);
        assert!(mix_voice_over_music(&voice, &music, &MixParams::default()).is_err());
    }

    #[test]
    fn mixer_decodes_narration_with_codec() {
        let codec = RawPcmCodec {
            sample_rate: SR,
            channels: 2,
        };
        let voice = constant(1_000, 0.1);
        let narration = NarrationTrack {
            encoded: codec.encode(&voice).unwrap(),
            chunk_count: 1,
        };
        let mixer = AudioMixer::new(&codec, MixParams::default());
        let mixed = mixer.mix(&narration, &constant(100, 0.0)).unwrap();
        assert_eq!(mixed.pcm.frames(), 2_500);
    }
}
