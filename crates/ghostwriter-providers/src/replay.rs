//! Replay client for tests and local development
//!
//! Replays a canned response chunk-by-chunk, optionally with a per-chunk
//! delay to mimic network pacing. Useful wherever a real backend would be
//! too slow or too flaky to exercise the streaming pipeline.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use tokio::time::sleep;

use crate::{
    client::{ModelClient, TextStream},
    error::ProviderError,
    request::GenerationRequest,
};

/// A [`ModelClient`] that replays pre-recorded chunks
#[derive(Debug, Clone)]
pub struct ReplayClient {
    chunks: Vec<String>,
    chunk_delay: Duration,
    streaming: bool,
}

impl ReplayClient {
    /// Replay the given chunks in order with no delay
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            chunk_delay: Duration::ZERO,
            streaming: true,
        }
    }

    /// Replay a full response split into fixed-size character chunks
    pub fn from_text(text: &str, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chars: Vec<char> = text.chars().collect();
        let chunks = chars
            .chunks(chunk_size)
            .map(|c| c.iter().collect())
            .collect();
        Self::new(chunks)
    }

    /// Delay between chunks, for pacing-sensitive tests
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Pretend to be a non-streaming backend
    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }
}

#[async_trait]
impl ModelClient for ReplayClient {
    fn id(&self) -> &str {
        "replay"
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn complete(&self, _request: GenerationRequest) -> Result<String, ProviderError> {
        Ok(self.chunks.concat())
    }

    async fn complete_stream(
        &self,
        _request: GenerationRequest,
    ) -> Result<TextStream, ProviderError> {
        let chunks = self.chunks.clone();
        let delay = self.chunk_delay;
        let stream = stream! {
            for chunk in chunks {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                yield Ok(chunk);
            }
        };
        Ok(Box::pin(stream))
    }
}
