pub type ReelResult<T> = Result<T, ReelError>;

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("validation error: {0}")]
    Validation(String),

    /// A speech-synthesis call failed; `input` is the exact text or markup that was submitted.
    #[error("speech synthesis failed for chunk {index}: {message} (input: {input})")]
    Synthesis {
        index: usize,
        input: String,
        message: String,
    },

    #[error("audio error: {0}")]
    Audio(String),

    #[error("scene allocation error: {0}")]
    Allocation(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("service error: {0}")]
    Service(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn synthesis(index: usize, input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Synthesis {
            index,
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ReelError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(ReelError::audio("x").to_string().contains("audio error:"));
        assert!(
            ReelError::allocation("x")
                .to_string()
                .contains("scene allocation error:")
        );
        assert!(ReelError::encode("x").to_string().contains("encode error:"));
        assert!(ReelError::service("x").to_string().contains("service error:"));
    }

    #[test]
    fn synthesis_error_surfaces_failing_input() {
        let err = ReelError::synthesis(3, "<speak>boo</speak>", "HTTP 400");
        let msg = err.to_string();
        assert!(msg.contains("chunk 3"));
        assert!(msg.contains("<speak>boo</speak>"));
        assert!(msg.contains("HTTP 400"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ReelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
