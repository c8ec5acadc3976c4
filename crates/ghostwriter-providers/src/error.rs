//! Error types for model providers

use thiserror::Error;

/// Errors that can occur when talking to a model backend
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ProviderError {
    /// The stream was aborted before completing; expected during
    /// supersession and cancellation
    #[error("Stream aborted")]
    StreamAborted,

    /// Network error occurred
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Rate limited by provider
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Prompt is too large for the model
    #[error("Prompt too large: {0} tokens, max {1}")]
    PromptTooLarge(usize, usize),

    /// Invalid model specified
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic provider error
    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::SerializationError(err.to_string())
    }
}

impl ProviderError {
    /// Whether this error is an expected consequence of cancelling a
    /// request rather than a real failure
    pub fn is_abort(&self) -> bool {
        matches!(self, ProviderError::StreamAborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_is_not_a_failure() {
        assert!(ProviderError::StreamAborted.is_abort());
        assert!(!ProviderError::NetworkError("down".into()).is_abort());
    }
}
