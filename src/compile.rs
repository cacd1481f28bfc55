//! Scene clips plus mixed audio into one encoded video.

use std::path::PathBuf;

use image::RgbImage;
use tracing::{info, warn};

use crate::assets::image::load_normalized;
use crate::audio::mix::MixedTrack;
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::motion::{KenBurnsClip, ZoomRange};
use crate::pipeline::Progress;
use crate::scene::Scene;

/// What a successful compile produced.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileReport {
    /// Scenes that made it into the video.
    pub scene_count: usize,
    /// Paragraph indices of scenes skipped at compile time.
    pub skipped: Vec<usize>,
    pub frame_count: u64,
    pub duration_secs: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct VideoCompiler {
    canvas: Canvas,
    fps: Fps,
    zoom: ZoomRange,
}

impl VideoCompiler {
    pub fn new(canvas: Canvas, fps: Fps, zoom: ZoomRange) -> ReelResult<Self> {
        canvas.validate()?;
        Fps::new(fps.num, fps.den)?;
        zoom.validate()?;
        Ok(Self { canvas, fps, zoom })
    }

    /// Concatenate the scenes' clips and encode them with `mixed` as the only audio track.
    ///
    /// Scenes whose image is missing or unreadable are skipped. The output runs exactly as long as
    /// the audio: a clip shortfall is added to the last clip and any visual overrun is cut.
    pub fn compile(
        &self,
        scenes: &[Scene],
        mixed: &MixedTrack,
        sink: &mut dyn FrameSink,
        progress: &mut dyn FnMut(Progress),
    ) -> ReelResult<CompileReport> {
        let mut skipped = Vec::new();
        let mut loaded: Vec<(&Scene, RgbImage)> = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let Some(path) = scene.image.as_deref() else {
                warn!(scene = scene.paragraph_index, "scene has no image, skipping");
                skipped.push(scene.paragraph_index);
                continue;
            };
            match load_normalized(path, self.canvas) {
                Ok(img) => loaded.push((scene, img)),
                Err(e) => {
                    warn!(
                        scene = scene.paragraph_index,
                        path = %path.display(),
                        error = %e,
                        "scene image unreadable, skipping"
                    );
                    skipped.push(scene.paragraph_index);
                }
            }
        }
        if loaded.is_empty() {
            return Err(ReelError::encode("no scenes survived to compile"));
        }

        let audio_secs = mixed.duration_secs();
        let mut durations: Vec<f64> = loaded.iter().map(|(s, _)| s.duration_secs.max(0.0)).collect();
        let clip_sum: f64 = durations.iter().sum();
        if clip_sum < audio_secs
            && let Some(last) = durations.last_mut()
        {
            *last += audio_secs - clip_sum;
        }

        let clips = loaded
            .iter()
            .zip(&durations)
            .map(|((scene, img), &d)| KenBurnsClip::new(img, scene.effect, d, self.zoom))
            .collect::<ReelResult<Vec<_>>>()?;
        for ((scene, _), clip) in loaded.iter().zip(&clips) {
            info!(
                paragraph = scene.paragraph_index,
                duration_secs = clip.duration_secs(),
                motion = clip.effect().as_str(),
                "scene clip"
            );
        }
        let timeline = Timeline::new(&durations, self.fps);
        let total_frames = self.fps.secs_to_frames_round(audio_secs);

        let audio = TempPcmFile::write(mixed)?;
        let cfg = SinkConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            fps: self.fps,
            audio: Some(AudioInputConfig {
                path: audio.path.clone(),
                sample_rate: mixed.pcm.sample_rate,
                channels: mixed.pcm.channels,
            }),
            duration_secs: Some(audio_secs),
        };

        sink.begin(cfg)?;
        if let Err(e) = self.push_frames(&clips, &timeline, total_frames, sink, progress) {
            sink.abort();
            return Err(e);
        }
        sink.end()?;

        info!(
            scenes = clips.len(),
            frames = total_frames,
            duration_secs = audio_secs,
            "video compiled"
        );
        Ok(CompileReport {
            scene_count: clips.len(),
            skipped,
            frame_count: total_frames,
            duration_secs: audio_secs,
        })
    }

    fn push_frames(
        &self,
        clips: &[KenBurnsClip<'_>],
        timeline: &Timeline,
        total_frames: u64,
        sink: &mut dyn FrameSink,
        progress: &mut dyn FnMut(Progress),
    ) -> ReelResult<()> {
        let mut buf = vec![0u8; self.canvas.width as usize * self.canvas.height as usize * 3];
        let report_every = u64::from(self.fps.num / self.fps.den.max(1)).max(1);
        for f in 0..total_frames {
            let (clip_idx, local_t) = timeline.locate(f, self.fps);
            clips[clip_idx].render_rgb(local_t, self.canvas, &mut buf)?;
            sink.push_frame(FrameIndex(f), &buf)?;

            let done = f + 1;
            if done % report_every == 0 || done == total_frames {
                progress(Progress::FramesEncoded {
                    done,
                    total: total_frames,
                });
            }
        }
        Ok(())
    }
}

/// Clip boundaries on the frame grid.
#[derive(Debug)]
struct Timeline {
    start_secs: Vec<f64>,
    /// Exclusive end frame of each clip.
    end_frames: Vec<u64>,
}

impl Timeline {
    fn new(durations: &[f64], fps: Fps) -> Self {
        let mut start_secs = Vec::with_capacity(durations.len());
        let mut end_frames = Vec::with_capacity(durations.len());
        let mut acc = 0.0;
        for &d in durations {
            start_secs.push(acc);
            acc += d;
            end_frames.push(fps.secs_to_frames_round(acc));
        }
        Self {
            start_secs,
            end_frames,
        }
    }

    /// Clip index and clip-local time for frame `f`. Frames past the end stay on the last clip.
    fn locate(&self, f: u64, fps: Fps) -> (usize, f64) {
        let last = self.end_frames.len() - 1;
        let idx = self
            .end_frames
            .iter()
            .position(|&end| f < end)
            .unwrap_or(last);
        (idx, (fps.frames_to_secs(f) - self.start_secs[idx]).max(0.0))
    }
}

/// Mixed audio as raw `f32le` on disk for the encoder; removed on drop.
struct TempPcmFile {
    path: PathBuf,
}

impl TempPcmFile {
    fn write(mixed: &MixedTrack) -> ReelResult<Self> {
        use anyhow::Context as _;

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let path = std::env::temp_dir().join(format!(
            "storyreel_mix_{}_{nanos}.f32le",
            std::process::id()
        ));
        std::fs::write(&path, mixed.pcm.to_f32le_bytes())
            .with_context(|| format!("write temporary audio '{}'", path.display()))?;
        Ok(Self { path })
    }
}

impl Drop for TempPcmFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::audio::pcm::Pcm;
    use crate::encode::sink::InMemorySink;
    use crate::motion::MotionEffect;

    const CANVAS: Canvas = Canvas {
        width: 18,
        height: 32,
    };

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "storyreel_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn solid_png(dir: &Path, name: &str, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(CANVAS.width, CANVAS.height, image::Rgb(rgb))
            .save(&path)
            .unwrap();
        path
    }

    fn scene(index: usize, image: Option<PathBuf>, duration_secs: f64) -> Scene {
        Scene {
            paragraph_index: index,
            text: format!("paragraph {index}"),
            image,
            duration_secs,
            effect: MotionEffect::ZoomIn,
        }
    }

    fn mixed(secs: f64) -> MixedTrack {
        MixedTrack {
            pcm: Pcm::silent(1000, 1, (secs * 1000.0).round() as usize),
        }
    }

    fn compiler() -> VideoCompiler {
        VideoCompiler::new(CANVAS, Fps::new(10, 1).unwrap(), ZoomRange::default()).unwrap()
    }

    fn first_pixel(frame: &[u8]) -> [u8; 3] {
        [frame[0], frame[1], frame[2]]
    }

    #[test]
    fn shortfall_extends_last_clip_and_frames_match_audio() {
        let dir = temp_dir("compile_shortfall");
        let red = solid_png(&dir, "a.png", [255, 0, 0]);
        let blue = solid_png(&dir, "b.png", [0, 0, 255]);
        let scenes = vec![scene(0, Some(red), 0.4), scene(1, Some(blue), 0.4)];

        let mut sink = InMemorySink::new();
        let report = compiler()
            .compile(&scenes, &mixed(1.0), &mut sink, &mut |_| {})
            .unwrap();

        assert_eq!(report.frame_count, 10);
        assert_eq!(sink.frames().len(), 10);
        assert!(sink.is_finished());
        for (i, (idx, frame)) in sink.frames().iter().enumerate() {
            assert_eq!(idx.0, i as u64);
            let want = if i < 4 { [255, 0, 0] } else { [0, 0, 255] };
            assert_eq!(first_pixel(frame), want, "frame {i}");
        }
        let cfg = sink.config().unwrap();
        assert_eq!(cfg.duration_secs, Some(1.0));
        assert!(cfg.audio.is_some());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn visual_overrun_is_trimmed_to_audio() {
        let dir = temp_dir("compile_overrun");
        let red = solid_png(&dir, "a.png", [255, 0, 0]);
        let scenes = vec![scene(0, Some(red), 5.0)];

        let mut sink = InMemorySink::new();
        let report = compiler()
            .compile(&scenes, &mixed(1.5), &mut sink, &mut |_| {})
            .unwrap();
        assert_eq!(report.frame_count, 15);
        assert_eq!(sink.frames().len(), 15);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_or_unreadable_images_are_skipped() {
        let dir = temp_dir("compile_skip");
        let good = solid_png(&dir, "good.png", [0, 255, 0]);
        let corrupt = dir.join("corrupt.png");
        std::fs::write(&corrupt, b"nope").unwrap();
        let scenes = vec![
            scene(0, None, 0.5),
            scene(1, Some(corrupt), 0.5),
            scene(2, Some(dir.join("gone.png")), 0.5),
            scene(3, Some(good), 0.5),
        ];

        let mut sink = InMemorySink::new();
        let report = compiler()
            .compile(&scenes, &mixed(2.0), &mut sink, &mut |_| {})
            .unwrap();
        assert_eq!(report.scene_count, 1);
        assert_eq!(report.skipped, vec![0, 1, 2]);
        assert_eq!(sink.frames().len(), 20);
        assert!(sink.frames().iter().all(|(_, f)| first_pixel(f) == [0, 255, 0]));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn zero_survivors_fail_without_output() {
        let scenes = vec![scene(0, None, 1.0)];
        let mut sink = InMemorySink::new();
        assert!(compiler()
            .compile(&scenes, &mixed(1.0), &mut sink, &mut |_| {})
            .is_err());
        assert!(sink.config().is_none());
    }

    #[test]
    fn progress_reports_reach_total() {
        let dir = temp_dir("compile_progress");
        let red = solid_png(&dir, "a.png", [255, 0, 0]);
        let scenes = vec![scene(0, Some(red), 2.5)];

        let mut last = None;
        let mut sink = InMemorySink::new();
        compiler()
            .compile(&scenes, &mixed(2.5), &mut sink, &mut |p| {
                if let Progress::FramesEncoded { done, total } = p {
                    last = Some((done, total));
                }
            })
            .unwrap();
        assert_eq!(last, Some((25, 25)));

        std::fs::remove_dir_all(&dir).ok();
    }

    /// Accepts `fail_at` frames, then errors; records whether it was aborted or ended.
    #[derive(Default)]
    struct BrokenSink {
        fail_at: u64,
        pushed: u64,
        aborted: bool,
        ended: bool,
    }

    impl FrameSink for BrokenSink {
        fn begin(&mut self, _cfg: SinkConfig) -> ReelResult<()> {
            Ok(())
        }

        fn push_frame(&mut self, idx: FrameIndex, _rgb: &[u8]) -> ReelResult<()> {
            if idx.0 >= self.fail_at {
                return Err(ReelError::encode("disk full"));
            }
            self.pushed += 1;
            Ok(())
        }

        fn end(&mut self) -> ReelResult<()> {
            self.ended = true;
            Ok(())
        }

        fn abort(&mut self) {
            self.aborted = true;
        }
    }

    #[test]
    fn failed_push_aborts_sink_and_never_ends_it() {
        let dir = temp_dir("compile_abort");
        let red = solid_png(&dir, "a.png", [255, 0, 0]);
        let scenes = vec![scene(0, Some(red), 1.0)];

        let mut sink = BrokenSink {
            fail_at: 4,
            ..BrokenSink::default()
        };
        let err = compiler()
            .compile(&scenes, &mixed(1.0), &mut sink, &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, ReelError::Encode(_)), "{err}");
        assert_eq!(sink.pushed, 4);
        assert!(sink.aborted);
        assert!(!sink.ended);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn timeline_gives_zero_length_clips_no_frames() {
        let fps = Fps::new(10, 1).unwrap();
        let t = Timeline::new(&[0.3, 0.0, 0.7], fps);
        assert_eq!(t.end_frames, vec![3, 3, 10]);
        assert_eq!(t.locate(2, fps).0, 0);
        assert_eq!(t.locate(3, fps).0, 2);
        let (_, local) = t.locate(5, fps);
        assert!((local - 0.2).abs() < 1e-9);
        assert_eq!(t.locate(99, fps).0, 2);
    }
}
