//! Completion settings data model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How multi-line completions are surfaced to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultilineMode {
    /// Return the whole completion as a single acceptance
    #[default]
    Auto,
    /// Return the first line, hold the remainder for a second acceptance
    TwoStage,
}

/// Per-model generation parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelParams {
    /// Sampling temperature override
    pub temperature: Option<f32>,
    /// Generation budget override
    pub max_tokens: Option<usize>,
}

/// Settings consumed read-only by the completion engine
///
/// Loaded by [`crate::SettingsLoader`]; every field has a default so partial
/// files work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Delay before a pending request starts generating, in milliseconds
    pub debounce_delay_ms: u64,
    /// Include import lines in the gathered context
    pub include_imports: bool,
    /// Resolve nearby symbol definitions into the gathered context
    pub include_definitions: bool,
    /// Include recently edited ranges as snippets
    pub include_recent_edits: bool,
    /// Multi-line completion behavior
    pub multiline: MultilineMode,
    /// Active model identifier, used for template selection
    pub model: String,
    /// Per-model parameter overrides, keyed by model identifier
    pub model_params: HashMap<String, ModelParams>,
    /// Glob patterns for files where completion is disabled
    pub disabled_files: Vec<String>,
    /// Minimum typed characters before an automatic trigger fires
    pub min_typed_length: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            debounce_delay_ms: 150,
            include_imports: true,
            include_definitions: true,
            include_recent_edits: false,
            multiline: MultilineMode::default(),
            model: "qwen2.5-coder-7b".to_string(),
            model_params: HashMap::new(),
            disabled_files: Vec::new(),
            min_typed_length: 4,
        }
    }
}

impl CompletionSettings {
    /// Look up parameter overrides for the active model
    pub fn params_for_model(&self, model: &str) -> ModelParams {
        self.model_params.get(model).cloned().unwrap_or_default()
    }
}
