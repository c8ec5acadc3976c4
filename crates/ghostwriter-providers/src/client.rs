//! Model client trait

use async_trait::async_trait;
use futures;

use crate::{error::ProviderError, request::GenerationRequest};

/// A stream of generated text chunks
///
/// Finite and not restartable. Consumers stop reading (and drop the stream)
/// to cancel; backends must tolerate being dropped mid-read.
pub type TextStream = futures::stream::BoxStream<'static, Result<String, ProviderError>>;

/// Core trait every completion backend must implement
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Get the client's unique identifier
    fn id(&self) -> &str;

    /// Whether this backend can stream incremental chunks
    ///
    /// When `false`, callers fall back to [`ModelClient::complete`] and
    /// receive the whole response at once.
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Generate a completion as a single string
    async fn complete(&self, request: GenerationRequest) -> Result<String, ProviderError>;

    /// Generate a completion as an incremental stream of text chunks
    async fn complete_stream(&self, request: GenerationRequest)
        -> Result<TextStream, ProviderError>;
}
