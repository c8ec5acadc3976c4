//! Ghostwriter model providers - unified abstraction over completion backends
//!
//! This crate defines the seam between the completion engine and whatever
//! actually produces text: a streaming HTTP client, a local model runner, or
//! the replay client used in tests. The engine only ever sees the
//! [`ModelClient`] trait and a stream of text chunks.

pub mod client;
pub mod error;
pub mod replay;
pub mod request;

pub use client::{ModelClient, TextStream};
pub use error::ProviderError;
pub use replay::ReplayClient;
pub use request::GenerationRequest;
