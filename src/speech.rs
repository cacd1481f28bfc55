//! Per-chunk speech synthesis and narration assembly.

use std::path::Path;

use tracing::{debug, info};

use crate::audio::pcm::AudioCodec;
use crate::foundation::error::{ReelError, ReelResult};
use crate::pipeline::Progress;

/// What a synthesis call receives for one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeechInput {
    Text(String),
    /// Full `<speak>` document with inline `<sub alias>` annotations.
    Markup(String),
}

impl SpeechInput {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Markup(s) => s,
        }
    }

    pub fn is_markup(&self) -> bool {
        matches!(self, Self::Markup(_))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AudioEncoding {
    #[default]
    Mp3,
    Wav,
}

#[derive(Clone, Copy, Debug)]
pub struct SpeechRequest<'a> {
    pub input: &'a SpeechInput,
    pub voice: &'a str,
    pub language: &'a str,
    pub encoding: AudioEncoding,
}

/// A speech-synthesis service. Returns encoded audio bytes for one request.
pub trait SpeechSynthesizer {
    fn synthesize(&self, request: &SpeechRequest<'_>) -> ReelResult<Vec<u8>>;
}

/// Surface form to phonetic alias substitutions applied before synthesis.
#[derive(Clone, Debug, Default)]
pub struct PronunciationOverrides {
    // Longest surface form first so overlapping keys prefer the longer match.
    entries: Vec<(String, String)>,
}

impl PronunciationOverrides {
    pub fn new(map: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut entries: Vec<(String, String)> =
            map.into_iter().filter(|(k, _)| !k.is_empty()).collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    /// Plain text when no surface form occurs in `chunk`; otherwise markup with every occurrence
    /// annotated.
    pub fn prepare(&self, chunk: &str) -> SpeechInput {
        if !self.entries.iter().any(|(k, _)| chunk.contains(k.as_str())) {
            return SpeechInput::Text(chunk.to_string());
        }

        let mut body = String::with_capacity(chunk.len() + 32);
        let mut plain_start = 0;
        let mut i = 0;
        while i < chunk.len() {
            let rest = &chunk[i..];
            if let Some((surface, alias)) = self
                .entries
                .iter()
                .find(|(k, _)| rest.starts_with(k.as_str()))
            {
                escape_into(&mut body, &chunk[plain_start..i]);
                body.push_str("<sub alias=\"");
                escape_into(&mut body, alias);
                body.push_str("\">");
                escape_into(&mut body, surface);
                body.push_str("</sub>");
                i += surface.len();
                plain_start = i;
                continue;
            }
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
        escape_into(&mut body, &chunk[plain_start..]);

        SpeechInput::Markup(format!("<speak>{body}</speak>"))
    }
}

fn escape_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Continuous narration audio, still encoded.
#[derive(Clone, Debug)]
pub struct NarrationTrack {
    pub encoded: Vec<u8>,
    pub chunk_count: usize,
}

impl NarrationTrack {
    pub fn write_to(&self, path: &Path) -> ReelResult<()> {
        use anyhow::Context as _;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create narration directory '{}'", parent.display())
            })?;
        }
        std::fs::write(path, &self.encoded)
            .with_context(|| format!("failed to write narration '{}'", path.display()))?;
        Ok(())
    }
}

pub struct SpeechAssembler<'a> {
    synth: &'a dyn SpeechSynthesizer,
    codec: &'a dyn AudioCodec,
    overrides: &'a PronunciationOverrides,
}

impl<'a> SpeechAssembler<'a> {
    pub fn new(
        synth: &'a dyn SpeechSynthesizer,
        codec: &'a dyn AudioCodec,
        overrides: &'a PronunciationOverrides,
    ) -> Self {
        Self {
            synth,
            codec,
            overrides,
        }
    }

    /// Synthesize every chunk in order and join the results into one track.
    ///
    /// The first failing chunk aborts the whole assembly. A single chunk is returned byte-for-byte
    /// as the service produced it.
    pub fn assemble(
        &self,
        chunks: &[String],
        voice: &str,
        language: &str,
        progress: &mut dyn FnMut(Progress),
    ) -> ReelResult<NarrationTrack> {
        if chunks.is_empty() {
            return Err(ReelError::validation("no speech chunks to synthesize"));
        }

        let mut encoded_chunks = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let input = self.overrides.prepare(chunk);
            let request = SpeechRequest {
                input: &input,
                voice,
                language,
                encoding: AudioEncoding::Mp3,
            };
            debug!(index, markup = input.is_markup(), "synthesizing chunk");

            let bytes = self
                .synth
                .synthesize(&request)
                .map_err(|e| ReelError::synthesis(index, input.as_str(), e.to_string()))?;
            if bytes.is_empty() {
                return Err(ReelError::synthesis(
                    index,
                    input.as_str(),
                    "service returned no audio",
                ));
            }
            encoded_chunks.push(bytes);
            progress(Progress::ChunkSynthesized {
                index,
                total: chunks.len(),
            });
        }

        if encoded_chunks.len() == 1 {
            let encoded = encoded_chunks.pop().unwrap_or_default();
            return Ok(NarrationTrack {
                encoded,
                chunk_count: 1,
            });
        }

        let mut joined = self.codec.decode(&encoded_chunks[0])?;
        for bytes in &encoded_chunks[1..] {
            joined.append(&self.codec.decode(bytes)?)?;
        }
        info!(
            chunks = encoded_chunks.len(),
            duration_ms = joined.duration_ms(),
            "narration assembled"
        );

        Ok(NarrationTrack {
            encoded: self.codec.encode(&joined)?,
            chunk_count: encoded_chunks.len(),
        })
    }
}
