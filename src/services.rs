//! External services the pipeline talks to, and their HTTP adapters.
//!
//! Every call is blocking and issued one at a time by the pipeline.

use crate::foundation::error::{ReelError, ReelResult};

/// Google Cloud Text-to-Speech over REST.
pub mod google_tts;
/// Plain HTTP image generation endpoint.
pub mod image_gen;
/// OpenAI chat completions as a scene-prompt writer.
pub mod prompter;

pub use google_tts::GoogleTts;
pub use image_gen::HttpImageGenerator;
pub use prompter::OpenAiPrompter;

/// Turns a descriptive prompt into raster image bytes.
pub trait ImageGenerator {
    /// `aspect_ratio` is a `w:h` label such as `9:16`.
    fn generate(&self, prompt: &str, aspect_ratio: &str) -> ReelResult<Vec<u8>>;
}

/// Writes a short English image prompt for one paragraph of narration.
///
/// An `Err` means the service could not produce a usable prompt.
pub trait ScenePrompter {
    fn scene_prompt(&self, paragraph: &str) -> ReelResult<String>;
}

/// Blocking client with the given request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> ReelResult<reqwest::blocking::Client> {
    use anyhow::Context as _;

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")?;
    Ok(client)
}

/// Error for a non-2xx response, carrying whatever body text came back.
pub(crate) fn status_error(service: &str, response: reqwest::blocking::Response) -> ReelError {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    ReelError::service(format!(
        "{service} failed: {status}: {}",
        body.trim()
    ))
}
