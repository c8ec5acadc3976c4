//! Request model shared by all completion backends

use serde::{Deserialize, Serialize};

/// A single-shot text generation request
///
/// Produced once by the prompt renderer and consumed once by the model
/// client. Stop tokens are the template's own plus any language-derived
/// comment markers appended by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model to use
    pub model: String,
    /// Fully rendered prompt
    pub prompt: String,
    /// Strings that end the completion early when generated
    pub stop_tokens: Vec<String>,
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
}

impl GenerationRequest {
    /// Create a request with no sampling overrides
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stop_tokens: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the stop tokens
    pub fn with_stop_tokens(mut self, stop_tokens: Vec<String>) -> Self {
        self.stop_tokens = stop_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generation budget
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
