use thiserror::Error;

/// Errors that can occur while adapting a completion call
#[derive(Debug, Error)]
pub enum LlmError {
    /// A message role or content part the runner protocol cannot carry
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// More than one image was supplied; the runner accepts a single image per request
    #[error("multiple images are not supported as input (got {count})")]
    MultipleImagesUnsupported { count: usize },

    /// Tool choice kind with no wire equivalent
    #[error("unsupported tool choice: {0}")]
    UnsupportedToolChoice(String),

    /// Response format kind with no wire equivalent
    #[error("unsupported response format: {0}")]
    UnsupportedResponseFormat(String),

    /// Runner answered in a different mode than the one requested
    #[error("unexpected response shape: expected {expected}, received {received}")]
    UnexpectedResponseShape {
        expected: &'static str,
        received: &'static str,
    },

    /// Runner request failed or returned an error status
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Event source failed mid-stream
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Whether the caller may reasonably retry the same call
    ///
    /// Validation and contract errors are deterministic and never retryable.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Streaming(_))
    }
}
