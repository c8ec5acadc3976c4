//! Core types and data structures for the completion engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for completion operations
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Completion-specific error type
///
/// None of these ever escape the provider façade: every failure path
/// resolves to "no suggestion this time".
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Context gathering failed; degrade to empty context
    #[error("Context gathering failed: {0}")]
    ContextGatherError(String),

    /// The model client failed
    #[error("Model client error: {0}")]
    ModelClientError(#[from] ghostwriter_providers::ProviderError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Position in a document (line and character)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-based)
    pub line: u32,
    /// Character offset within the line (0-based)
    pub character: u32,
}

impl Position {
    /// Create a new position
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Why a completion was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Explicitly requested by the user
    Invoke,
    /// Fired by typing or cursor movement
    Automatic,
}

/// A symbol definition resolved into the context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// File the definition lives in
    pub filepath: String,
    /// The definition text
    pub content: String,
}

/// Bounded view of the document around the cursor
///
/// Built fresh per request and owned exclusively by that request.
#[derive(Debug, Clone, Default)]
pub struct CodeContext {
    /// Text of the current line up to the cursor
    pub current_line: String,
    /// Text of the current line after the cursor
    pub current_line_suffix: String,
    /// Lines before the current line, in source order
    pub preceding_lines: Vec<String>,
    /// Lines after the current line, in source order
    pub following_lines: Vec<String>,
    /// Import-like statements found in the file, in source order
    pub imports: Vec<String>,
    /// Definitions of symbols referenced near the cursor, in source order
    pub definitions: Vec<Definition>,
}

/// A unit of contextual text supplied to the prompt
///
/// Immutable once constructed; ordering within a snippet list is
/// significant and preserved from assembly to rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snippet {
    /// Code from a real file
    Code { filepath: String, content: String },
    /// Working-tree diff
    Diff { content: String },
    /// Clipboard contents
    Clipboard {
        content: String,
        copied_at: DateTime<Utc>,
    },
    /// Synthetic context such as import lines
    Context { filepath: String, content: String },
}

impl Snippet {
    /// The locator shown in prompt comments for this snippet
    pub fn filepath(&self) -> &str {
        match self {
            Snippet::Code { filepath, .. } | Snippet::Context { filepath, .. } => filepath,
            Snippet::Diff { .. } => "diff://working-tree",
            Snippet::Clipboard { .. } => "clipboard://current",
        }
    }

    /// The snippet text
    pub fn content(&self) -> &str {
        match self {
            Snippet::Code { content, .. }
            | Snippet::Context { content, .. }
            | Snippet::Diff { content }
            | Snippet::Clipboard { content, .. } => content,
        }
    }
}

/// Resolved generation options for a single request
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Stop tokens: the template's own plus language comment markers
    pub stop_tokens: Vec<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Generation budget
    pub max_tokens: Option<usize>,
}

/// Fully rendered prompt plus everything the generator needs
///
/// Produced once per request by the renderer, consumed once by the
/// stream processor.
#[derive(Debug, Clone)]
pub struct PromptResult {
    /// Final prompt string
    pub prompt: String,
    /// Text before the cursor, after any template compilation
    pub prefix: String,
    /// Text after the cursor, never empty (defaults to a newline)
    pub suffix: String,
    /// Resolved generation options
    pub options: GenerationOptions,
}

/// Opaque token identifying one completion request
///
/// Monotonically increasing; at most one id is "active" per session and
/// starting a new request invalidates the previous id immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl RequestId {
    /// The id used before any request has started
    pub const NONE: RequestId = RequestId(0);
}

impl Default for RequestId {
    fn default() -> Self {
        RequestId::NONE
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// The streamed completion split for incremental display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionPreview {
    /// The immediately visible first line
    pub first_line: String,
    /// Everything after the first newline; empty for single-line completions
    pub remaining_lines: String,
    /// The cleaned full text
    pub raw_text: String,
}

impl CompletionPreview {
    /// Split cleaned text on the first newline into a preview pair
    pub fn from_cleaned(text: &str) -> Self {
        match text.split_once('\n') {
            Some((first, rest)) => Self {
                first_line: first.to_string(),
                remaining_lines: rest.to_string(),
                raw_text: text.to_string(),
            },
            None => Self {
                first_line: text.to_string(),
                remaining_lines: String::new(),
                raw_text: text.to_string(),
            },
        }
    }

    /// Whether the completion fits on one line
    pub fn is_single_line(&self) -> bool {
        self.remaining_lines.is_empty()
    }
}

/// Everything the editor hands the façade per trigger
#[derive(Debug, Clone)]
pub struct CompletionQuery {
    /// Document identity
    pub uri: String,
    /// Full document text
    pub text: String,
    /// Language identifier (e.g. "rust", "typescript")
    pub language_id: String,
    /// Cursor position
    pub position: Position,
    /// Why this trigger fired
    pub trigger: TriggerKind,
    /// The word currently being typed, when the editor knows it
    pub typed_prefix: Option<String>,
}

/// Command identifier the editor binds to accept a completion item
pub const ACCEPT_COMMAND: &str = "ghostwriter.completion.accept";

/// Zero-or-one completion item returned to the editor
///
/// For two-stage completions the first returned item carries only the
/// first line; the remainder arrives on the next invocation after
/// acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineCompletion {
    /// Text to insert at the cursor
    pub insert_text: String,
    /// Command to run on acceptance
    pub accept_command: &'static str,
    /// The request that produced this item
    pub request_id: RequestId,
}
