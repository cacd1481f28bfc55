use serde::Deserialize;
use serde_json::json;

use crate::foundation::error::{ReelError, ReelResult};
use crate::services::{ScenePrompter, http_client, status_error};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Replies this short are treated as a refusal.
const MIN_PROMPT_CHARS: usize = 11;

pub struct OpenAiPrompter {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiPrompter {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> ReelResult<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Instruction sent for one paragraph: a cinematic still set in Thailand.
pub fn instruction(paragraph: &str) -> String {
    format!(
        "The following Thai text is one scene of a cinematic short video with a distinctly Thai \
         look:\n\n\
         '{paragraph}'\n\n\
         Write a vivid English prompt for an AI image generator that shows this scene. Ground it \
         in Thai culture: traditional Thai houses, Thai clothing and local architecture, with an \
         eerie or ghostly mood where the text calls for one. Describe cinematic lighting. Do not \
         use Western settings. Aim for about 80 words.\n\n\
         English Image Prompt:"
    )
}

/// The trimmed reply, or `None` if it is too short to be a prompt.
pub fn accept_reply(reply: &str) -> Option<String> {
    let reply = reply.trim();
    (reply.chars().count() >= MIN_PROMPT_CHARS).then(|| reply.to_string())
}

impl ScenePrompter for OpenAiPrompter {
    fn scene_prompt(&self, paragraph: &str) -> ReelResult<String> {
        if paragraph.trim().is_empty() {
            return Err(ReelError::validation("no paragraph text to build a prompt from"));
        }
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": instruction(paragraph) }],
            "max_tokens": 150,
            "temperature": 0.7,
        });

        let res = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| ReelError::service(format!("prompt request failed: {e}")))?;
        if !res.status().is_success() {
            return Err(status_error("prompt generation", res));
        }

        let chat: ChatResponse = res
            .json()
            .map_err(|e| ReelError::service(format!("prompt response was not JSON: {e}")))?;
        let reply = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        accept_reply(&reply)
            .ok_or_else(|| ReelError::service("prompt reply was empty or too short"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_replies_are_rejected() {
        assert_eq!(accept_reply("   "), None);
        assert_eq!(accept_reply("0123456789"), None);
        assert_eq!(
            accept_reply("  a misty temple  "),
            Some("a misty temple".to_string())
        );
    }

    #[test]
    fn instruction_embeds_paragraph() {
        let text = instruction("บ้านร้างกลางป่า");
        assert!(text.contains("'บ้านร้างกลางป่า'"));
        assert!(text.contains("cinematic lighting"));
        assert!(text.contains("Do not use Western settings"));
        assert!(text.ends_with("English Image Prompt:"));
    }
}
