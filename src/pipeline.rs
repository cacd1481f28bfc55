//! End-to-end generation: script in, narrated vertical video out.
//!
//! Every stage runs to completion before the next starts, and external services are called one
//! request at a time in input order.

use std::path::PathBuf;

use rand::RngCore;
use tracing::{info, warn};

use crate::artifacts::{ArtifactNames, purge_stale_images, safe_title};
use crate::assets::image::{normalize_to_canvas, save_jpeg};
use crate::audio::mix::AudioMixer;
use crate::audio::music::MusicLibrary;
use crate::audio::pcm::AudioCodec;
use crate::compile::VideoCompiler;
use crate::config::PipelineConfig;
use crate::encode::sink::VideoTarget;
use crate::foundation::error::{ReelError, ReelResult};
use crate::motion::MotionEffect;
use crate::scene::{self, Scene};
use crate::services::{ImageGenerator, ScenePrompter};
use crate::speech::{PronunciationOverrides, SpeechAssembler, SpeechSynthesizer};
use crate::text;

/// Step notifications for a caller-supplied callback. Purely informational.
#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
    ChunkSynthesized { index: usize, total: usize },
    NarrationReady { chunks: usize },
    MixReady { duration_secs: f64 },
    ScenesAllocated { count: usize },
    SceneAcquired { index: usize, total: usize },
    SceneSkipped { index: usize, total: usize },
    FramesEncoded { done: u64, total: u64 },
}

#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub script: String,
    /// Selects the music folder, and names artifacts when there is no title.
    pub topic: String,
    pub title: Option<String>,
    pub voice: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneSummary {
    pub paragraph_index: usize,
    pub image: PathBuf,
    pub duration_secs: f64,
    pub effect: MotionEffect,
}

/// Everything a finished run produced.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct GenerationOutcome {
    pub video: PathBuf,
    pub mixed_audio: PathBuf,
    pub narration: PathBuf,
    /// Length of the mixed audio, and so of the video.
    pub duration_secs: f64,
    pub scenes: Vec<SceneSummary>,
    /// Paragraph indices of allocated scenes that were dropped.
    pub skipped: Vec<usize>,
}

/// The external services a run calls.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub speech: &'a dyn SpeechSynthesizer,
    pub prompter: &'a dyn ScenePrompter,
    pub images: &'a dyn ImageGenerator,
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    services: Services<'a>,
    codec: &'a dyn AudioCodec,
    music: MusicLibrary,
    overrides: PronunciationOverrides,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        services: Services<'a>,
        codec: &'a dyn AudioCodec,
    ) -> ReelResult<Self> {
        config.validate()?;
        let music = MusicLibrary::new(
            config.music.root.clone(),
            config.music.topics.clone(),
            &config.music.default_track,
        );
        let overrides = PronunciationOverrides::new(config.pronunciation.clone());
        Ok(Self {
            config,
            services,
            codec,
            music,
            overrides,
        })
    }

    pub fn generate(
        &self,
        request: &GenerationRequest,
        rng: &mut dyn RngCore,
        target: &mut dyn VideoTarget,
        progress: &mut dyn FnMut(Progress),
    ) -> ReelResult<GenerationOutcome> {
        let cfg = self.config;
        let cleaned = text::clean_for_speech(&request.script);
        let chunks = text::split_into_speech_chunks(&cleaned, cfg.max_words);
        if chunks.is_empty() {
            return Err(ReelError::validation("script has no speakable text"));
        }
        let names = ArtifactNames::now(safe_title(request.title.as_deref(), &request.topic));
        info!(title = names.safe_title(), chunks = chunks.len(), "generation started");

        let narration = SpeechAssembler::new(self.services.speech, self.codec, &self.overrides)
            .assemble(&chunks, &request.voice, &cfg.language, progress)?;
        let narration_path = names.narration(&cfg.output.narration, self.codec.extension());
        narration.write_to(&narration_path)?;
        progress(Progress::NarrationReady {
            chunks: narration.chunk_count,
        });

        let bed = self.music.load_bed(&request.topic, rng, self.codec)?;
        let mixed = AudioMixer::new(self.codec, cfg.mix.clone()).mix(&narration, &bed)?;
        let mixed_path = names.mixed_audio(&cfg.output.mixed_audio, self.codec.extension());
        mixed.write_to(self.codec, &mixed_path)?;
        let d_mix = mixed.duration_secs();
        info!(duration_secs = d_mix, path = %mixed_path.display(), "mixed audio written");
        progress(Progress::MixReady {
            duration_secs: d_mix,
        });

        // Cleaned text, so a block holding only a stage direction gets no scene.
        let paragraphs = text::split_into_scene_paragraphs(&cleaned);
        let scenes = scene::allocate(&paragraphs, d_mix, cfg.max_scenes, rng)?;
        progress(Progress::ScenesAllocated {
            count: scenes.len(),
        });

        purge_stale_images(&cfg.output.images, names.safe_title());
        let (mut kept, mut skipped) = self.acquire_images(scenes, &names, progress);
        let residual = scene::reconcile(&mut kept, d_mix, cfg.tolerance_secs)?;
        if residual != 0.0 {
            info!(residual, "scene durations reconciled to mixed audio");
        }

        let video_path = names.video(&cfg.output.videos, kept.len());
        let compiler = VideoCompiler::new(cfg.canvas, cfg.fps, cfg.zoom)?;
        let sink = target.open(&video_path)?;
        let report = compiler.compile(&kept, &mixed, sink, progress)?;
        skipped.extend(report.skipped.iter().copied());
        skipped.sort_unstable();

        let scenes = kept
            .into_iter()
            .filter(|s| !report.skipped.contains(&s.paragraph_index))
            .filter_map(|s| {
                Some(SceneSummary {
                    paragraph_index: s.paragraph_index,
                    image: s.image?,
                    duration_secs: s.duration_secs,
                    effect: s.effect,
                })
            })
            .collect();
        info!(video = %video_path.display(), "generation finished");
        Ok(GenerationOutcome {
            video: video_path,
            mixed_audio: mixed_path,
            narration: narration_path,
            duration_secs: d_mix,
            scenes,
            skipped,
        })
    }

    /// Prompt, generate, normalize and save one image per scene. Returns kept scenes and the
    /// paragraph indices of skipped ones.
    fn acquire_images(
        &self,
        scenes: Vec<Scene>,
        names: &ArtifactNames,
        progress: &mut dyn FnMut(Progress),
    ) -> (Vec<Scene>, Vec<usize>) {
        let cfg = self.config;
        let aspect = cfg.canvas.aspect_label();
        let total = scenes.len();
        let mut kept = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        for (i, mut scene) in scenes.into_iter().enumerate() {
            let prompt = match self.services.prompter.scene_prompt(&scene.text) {
                Ok(p) => p,
                Err(e) => {
                    warn!(scene = i + 1, error = %e, "scene prompt unavailable, using default");
                    cfg.default_prompt.clone()
                }
            };

            let path = names.scene_image(&cfg.output.images, i + 1);
            let acquired = self
                .services
                .images
                .generate(&prompt, &aspect)
                .and_then(|bytes| normalize_to_canvas(&bytes, cfg.canvas))
                .and_then(|img| save_jpeg(&img, &path));
            match acquired {
                Ok(()) => {
                    scene.image = Some(path);
                    kept.push(scene);
                    progress(Progress::SceneAcquired { index: i, total });
                }
                Err(e) => {
                    warn!(scene = i + 1, error = %e, "image acquisition failed, skipping scene");
                    skipped.push(scene.paragraph_index);
                    progress(Progress::SceneSkipped { index: i, total });
                }
            }
        }
        (kept, skipped)
    }
}
