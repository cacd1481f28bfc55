use base64::Engine as _;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::foundation::error::{ReelError, ReelResult};
use crate::services::{http_client, status_error};
use crate::speech::{AudioEncoding, SpeechInput, SpeechRequest, SpeechSynthesizer};

pub const DEFAULT_BASE_URL: &str = "https://texttospeech.googleapis.com";

pub struct GoogleTts {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl GoogleTts {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> ReelResult<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

/// JSON body for `text:synthesize`.
pub fn request_body(request: &SpeechRequest<'_>) -> Value {
    let input = match request.input {
        SpeechInput::Text(text) => json!({ "text": text }),
        SpeechInput::Markup(ssml) => json!({ "ssml": ssml }),
    };
    let encoding = match request.encoding {
        AudioEncoding::Mp3 => "MP3",
        AudioEncoding::Wav => "LINEAR16",
    };
    json!({
        "input": input,
        "voice": {
            "languageCode": request.language,
            "name": request.voice,
        },
        "audioConfig": { "audioEncoding": encoding },
    })
}

impl SpeechSynthesizer for GoogleTts {
    fn synthesize(&self, request: &SpeechRequest<'_>) -> ReelResult<Vec<u8>> {
        let url = format!(
            "{}/v1/text:synthesize",
            self.base_url.trim_end_matches('/')
        );
        debug!(voice = request.voice, "google tts request");

        let res = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(request))
            .send()
            .map_err(|e| ReelError::service(format!("Google TTS request failed: {e}")))?;
        if !res.status().is_success() {
            return Err(status_error("Google TTS", res));
        }

        let body: SynthesizeResponse = res
            .json()
            .map_err(|e| ReelError::service(format!("Google TTS response was not JSON: {e}")))?;
        base64::engine::general_purpose::STANDARD
            .decode(body.audio_content.as_bytes())
            .map_err(|e| ReelError::service(format!("Google TTS audio was not base64: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_switches_between_text_and_ssml() {
        let text = SpeechInput::Text("สวัสดี".to_string());
        let req = SpeechRequest {
            input: &text,
            voice: "th-TH-Standard-A",
            language: "th-TH",
            encoding: AudioEncoding::Mp3,
        };
        let body = request_body(&req);
        assert_eq!(body["input"]["text"], "สวัสดี");
        assert!(body["input"].get("ssml").is_none());
        assert_eq!(body["voice"]["name"], "th-TH-Standard-A");
        assert_eq!(body["audioConfig"]["audioEncoding"], "MP3");

        let ssml = SpeechInput::Markup("<speak>x</speak>".to_string());
        let req = SpeechRequest {
            input: &ssml,
            encoding: AudioEncoding::Wav,
            ..req
        };
        let body = request_body(&req);
        assert_eq!(body["input"]["ssml"], "<speak>x</speak>");
        assert_eq!(body["audioConfig"]["audioEncoding"], "LINEAR16");
    }
}
