use serde_json::json;
use tracing::debug;

use crate::foundation::error::{ReelError, ReelResult};
use crate::services::{ImageGenerator, http_client, status_error};

/// POSTs `{prompt, aspect_ratio}` and takes the response body as the image.
pub struct HttpImageGenerator {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpImageGenerator {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> ReelResult<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            url: url.into(),
        })
    }
}

impl ImageGenerator for HttpImageGenerator {
    fn generate(&self, prompt: &str, aspect_ratio: &str) -> ReelResult<Vec<u8>> {
        debug!(url = %self.url, aspect_ratio, "image generation request");
        let res = self
            .client
            .post(&self.url)
            .json(&json!({ "prompt": prompt, "aspect_ratio": aspect_ratio }))
            .send()
            .map_err(|e| ReelError::service(format!("image request failed: {e}")))?;
        if !res.status().is_success() {
            return Err(status_error("image generation", res));
        }

        let bytes = res
            .bytes()
            .map_err(|e| ReelError::service(format!("failed to read image response: {e}")))?;
        if bytes.is_empty() {
            return Err(ReelError::service("image service returned an empty body"));
        }
        Ok(bytes.to_vec())
    }
}
