//! On-disk names for everything a generation run writes.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use tracing::{debug, warn};

const TITLE_MAX_CHARS: usize = 50;
const TOPIC_MAX_CHARS: usize = 30;

static UNSAFE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\x{0E01}-\x{0E59}_]+").expect("static regex"));

/// Filesystem-safe stem derived from an explicit title, or from the topic when there is none.
///
/// Runs of anything outside ASCII alphanumerics, `_` and the Thai block collapse to one `_`.
pub fn safe_title(title: Option<&str>, topic: &str) -> String {
    let (source, max) = match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => (t, TITLE_MAX_CHARS),
        None => (topic.trim(), TOPIC_MAX_CHARS),
    };
    let safe: String = UNSAFE_RUN
        .replace_all(source, "_")
        .chars()
        .take(max)
        .collect();
    if safe.is_empty() || safe.chars().all(|c| c == '_') {
        return "untitled".to_string();
    }
    safe
}

/// Request-scoped artifact names: a sanitized title plus a generation stamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactNames {
    safe: String,
    stamp: String,
}

impl ArtifactNames {
    pub fn new(safe_title: impl Into<String>, stamp: impl Into<String>) -> Self {
        Self {
            safe: safe_title.into(),
            stamp: stamp.into(),
        }
    }

    /// Stamp from the current wall clock.
    pub fn now(safe_title: impl Into<String>) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::new(safe_title, format!("{}{:03}", now.as_secs(), now.subsec_millis()))
    }

    pub fn safe_title(&self) -> &str {
        &self.safe
    }

    /// `index` is 1-based.
    pub fn scene_image(&self, dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("{}_scene_{index:03}_{}.jpg", self.safe, self.stamp))
    }

    pub fn narration(&self, dir: &Path, extension: &str) -> PathBuf {
        dir.join(format!("narration_{}_{}.{extension}", self.safe, self.stamp))
    }

    pub fn mixed_audio(&self, dir: &Path, extension: &str) -> PathBuf {
        dir.join(format!("mixed_{}_{}.{extension}", self.safe, self.stamp))
    }

    pub fn video(&self, dir: &Path, scene_count: usize) -> PathBuf {
        dir.join(format!("reel_{}_{scene_count}scenes.mp4", self.safe))
    }
}

/// Remove every `{safe}_scene_*.jpg` left in `dir` by an earlier run. Returns how many went.
///
/// Failures are logged; a missing directory removes nothing.
pub fn purge_stale_images(dir: &Path, safe: &str) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let prefix = format!("{safe}_scene_");
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !(name.starts_with(&prefix) && name.ends_with(".jpg")) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!(file = name, "removed stale scene image");
                removed += 1;
            }
            Err(e) => warn!(file = name, error = %e, "failed to remove stale scene image"),
        }
    }
    removed
}
