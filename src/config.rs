//! Run configuration: optional JSON file plus credentials from the environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::mix::MixParams;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::motion::ZoomRange;
use crate::scene::{DEFAULT_MAX_SCENES, DEFAULT_TOLERANCE_SECS};
use crate::services::{google_tts, prompter};
use crate::text::DEFAULT_MAX_WORDS;

pub const DEFAULT_SCENE_PROMPT: &str =
    "A generic beautiful scene, art by Studio Ghibli, vibrant colors, detailed illustration";

pub const ENV_TTS_KEY: &str = "GOOGLE_TTS_API_KEY";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_IMAGE_URL: &str = "IMAGE_API_URL";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    /// Word budget per speech chunk.
    pub max_words: usize,
    pub max_scenes: usize,
    pub mix: MixParams,
    /// Allowed drift between summed scene durations and the mixed audio.
    pub tolerance_secs: f64,
    pub zoom: ZoomRange,
    pub mp3_bitrate: String,
    pub language: String,
    pub default_prompt: String,
    /// Surface form to phonetic alias.
    pub pronunciation: BTreeMap<String, String>,
    pub output: OutputDirs,
    pub music: MusicConfig,
    pub services: ServiceConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDirs {
    pub images: PathBuf,
    pub narration: PathBuf,
    pub mixed_audio: PathBuf,
    pub videos: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    pub root: PathBuf,
    /// Topic to folder name under `root`.
    pub topics: BTreeMap<String, String>,
    /// Relative to `root` unless absolute.
    pub default_track: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub tts_base_url: String,
    pub openai_base_url: String,
    pub prompt_model: String,
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::VERTICAL_HD,
            fps: Fps::default(),
            max_words: DEFAULT_MAX_WORDS,
            max_scenes: DEFAULT_MAX_SCENES,
            mix: MixParams::default(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            zoom: ZoomRange::default(),
            mp3_bitrate: "192k".to_string(),
            language: "th-TH".to_string(),
            default_prompt: DEFAULT_SCENE_PROMPT.to_string(),
            pronunciation: BTreeMap::from([("หลอน".to_string(), "ล๋อน".to_string())]),
            output: OutputDirs::default(),
            music: MusicConfig::default(),
            services: ServiceConfig::default(),
        }
    }
}

impl Default for OutputDirs {
    fn default() -> Self {
        Self {
            images: PathBuf::from("generated_images"),
            narration: PathBuf::from("narration"),
            mixed_audio: PathBuf::from("mixed_audio"),
            videos: PathBuf::from("final_videos"),
        }
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        let topics = [
            "เรื่องผีไทย & ตำนานลี้ลับ",
            "ประวัติศาสตร์",
            "วิทยาศาสตร์รอบตัว",
            "การพัฒนาตนเอง",
            "เทคโนโลยี AI",
            "การเงิน-การลงทุน",
            "สุขภาพ & ไลฟ์สไตล์",
            "ท่องเที่ยว & ประสบการณ์ชีวิต",
            "บันเทิง-ซีรีส์/ดารา",
            "ข่าว/โซเชียล/เทรนด์ฮิต",
            "How-To / เคล็ดลับ / DIY",
            "ธรรมชาติ/สัตว์โลก",
        ]
        .iter()
        .enumerate()
        .map(|(i, t)| (t.to_string(), (i + 1).to_string()))
        .collect();
        Self {
            root: PathBuf::from("music"),
            topics,
            default_track: PathBuf::from("lofi_chill2.mp3"),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tts_base_url: google_tts::DEFAULT_BASE_URL.to_string(),
            openai_base_url: prompter::DEFAULT_BASE_URL.to_string(),
            prompt_model: prompter::DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config; fields left out keep their defaults.
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        use anyhow::Context as _;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ReelResult<()> {
        self.canvas.validate()?;
        Fps::new(self.fps.num, self.fps.den)?;
        self.zoom.validate()?;
        if self.max_words == 0 {
            return Err(ReelError::validation("max_words must be > 0"));
        }
        if self.max_scenes == 0 {
            return Err(ReelError::validation("max_scenes must be > 0"));
        }
        if self.tolerance_secs.is_nan() || self.tolerance_secs < 0.0 {
            return Err(ReelError::validation("tolerance_secs must be >= 0"));
        }
        Ok(())
    }
}

/// Service credentials, read from the environment.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub google_tts_api_key: String,
    pub openai_api_key: String,
    pub image_api_url: String,
}

impl Credentials {
    pub fn from_env() -> ReelResult<Self> {
        Ok(Self {
            google_tts_api_key: require_env(ENV_TTS_KEY)?,
            openai_api_key: require_env(ENV_OPENAI_KEY)?,
            image_api_url: require_env(ENV_IMAGE_URL)?,
        })
    }
}

fn require_env(name: &str) -> ReelResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ReelError::validation(format!(
            "environment variable {name} is not set"
        ))),
    }
}
