//! storyreel turns a narration script into a vertical short-form video.
//!
//! The pipeline runs six stages in order:
//!
//! - chunk the script for speech synthesis and split it into scene paragraphs ([`text`])
//! - synthesize and join the narration ([`speech`])
//! - mix it over a topic music bed ([`audio`])
//! - allocate scenes across the mixed duration ([`scene`])
//! - animate each scene image with a slow zoom ([`motion`])
//! - concatenate the clips under the mixed audio and encode ([`compile`])
//!
//! [`Pipeline`] wires them to the external services.
#![forbid(unsafe_code)]

pub mod artifacts;
pub mod assets;
pub mod audio;
pub mod compile;
pub mod config;
pub mod encode;
pub mod foundation;
pub mod motion;
pub mod pipeline;
pub mod scene;
pub mod services;
pub mod speech;
pub mod text;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::audio::mix::{AudioMixer, MixParams, MixedTrack};
pub use crate::audio::music::MusicLibrary;
pub use crate::audio::pcm::{AudioCodec, FfmpegCodec, Pcm, RawPcmCodec};
pub use crate::compile::{CompileReport, VideoCompiler};
pub use crate::config::{Credentials, PipelineConfig};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, FfmpegTarget, is_ffmpeg_on_path};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig, VideoTarget};
pub use crate::motion::{KenBurnsClip, MotionEffect, ZoomRange};
pub use crate::pipeline::{
    GenerationOutcome, GenerationRequest, Pipeline, Progress, SceneSummary, Services,
};
pub use crate::scene::Scene;
pub use crate::services::{
    GoogleTts, HttpImageGenerator, ImageGenerator, OpenAiPrompter, ScenePrompter,
};
pub use crate::speech::{
    AudioEncoding, NarrationTrack, PronunciationOverrides, SpeechAssembler, SpeechInput,
    SpeechRequest, SpeechSynthesizer,
};
