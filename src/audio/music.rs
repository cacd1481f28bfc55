use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::RngCore;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::audio::pcm::{AudioCodec, Pcm};
use crate::foundation::error::{ReelError, ReelResult};

/// Background tracks grouped into per-topic folders under one root.
#[derive(Clone, Debug)]
pub struct MusicLibrary {
    root: PathBuf,
    topic_folders: BTreeMap<String, String>,
    default_track: PathBuf,
}

impl MusicLibrary {
    /// `default_track` is resolved against `root` unless absolute.
    pub fn new(
        root: impl Into<PathBuf>,
        topic_folders: BTreeMap<String, String>,
        default_track: impl AsRef<Path>,
    ) -> Self {
        let root = root.into();
        let default_track = root.join(default_track);
        Self {
            root,
            topic_folders,
            default_track,
        }
    }

    /// A random `.mp3` from the topic's folder, or the default track.
    pub fn pick(&self, topic: &str, rng: &mut dyn RngCore) -> PathBuf {
        let Some(folder) = self.topic_folders.get(topic) else {
            return self.default_track.clone();
        };
        let tracks = list_mp3s(&self.root.join(folder));
        tracks
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| self.default_track.clone())
    }

    /// Decode the bed for `topic`, falling back to the default track if the pick is unusable.
    pub fn load_bed(
        &self,
        topic: &str,
        rng: &mut dyn RngCore,
        codec: &dyn AudioCodec,
    ) -> ReelResult<Pcm> {
        let picked = self.pick(topic, rng);
        match load_track(&picked, codec) {
            Ok(pcm) => {
                info!(track = %picked.display(), "music bed selected");
                return Ok(pcm);
            }
            Err(e) if picked != self.default_track => {
                warn!(track = %picked.display(), error = %e, "music track unusable, using default");
            }
            Err(e) => return Err(e),
        }
        load_track(&self.default_track, codec)
    }
}

fn load_track(path: &Path, codec: &dyn AudioCodec) -> ReelResult<Pcm> {
    let bytes = std::fs::read(path).map_err(|e| {
        ReelError::audio(format!("failed to read music track '{}': {e}", path.display()))
    })?;
    let pcm = codec.decode(&bytes)?;
    if pcm.is_empty() {
        return Err(ReelError::audio(format!(
            "music track '{}' decoded to no audio",
            path.display()
        )));
    }
    Ok(pcm)
}

fn list_mp3s(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("mp3"))
        })
        .collect();
    // Stable order so a seeded rng picks the same file on every platform.
    out.sort();
    out
}
