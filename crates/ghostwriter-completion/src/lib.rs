/// Ghostwriter Completion Engine
///
/// An inline (ghost text) AI code completion engine: it turns an editor
/// cursor position into a single streamed suggestion, shown incrementally
/// while the model responds, with a two-stage "first line, then rest"
/// acceptance protocol that stays correct under rapid overlapping input.
///
/// # Architecture
///
/// The engine is a pipeline behind one façade:
///
/// 1. **Gates**: disabled-file globs, minimum typed length, debounce
/// 2. **Cache**: one entry per document keyed on exact text + cursor offset
/// 3. **Context Analysis**: bounded window, imports, nearby definitions
/// 4. **Snippet Assembly**: typed snippets from context and auxiliary
///    sources (clipboard, diff, recent edits), each behind a strict timeout
/// 5. **Prompt Rendering**: model-specific fill-in-middle template plus
///    resolved stop tokens
/// 6. **Stream Processing**: incremental markdown-cleaned preview updates
///    applied through the session state machine
///
/// # Concurrency
///
/// Execution is single-threaded and cooperative: suspension happens only
/// at the debounce sleep and while awaiting stream chunks. Correctness
/// under rapid input rests on request-id invalidation — starting a new
/// request invalidates the previous id before any suspension point, and
/// every stream consumer checks its id before applying a chunk.
///
/// # Core Components
///
/// ## InlineCompletionProvider
/// The façade the editor calls per trigger; returns zero or one
/// completion item. See [`provider::InlineCompletionProvider`].
///
/// ## CompletionSession
/// The authoritative per-request state machine:
/// `Idle → Loading → Streaming → PreviewingFirstLine →
/// PreviewingRemainder → Accepted | Dismissed | Cancelled`.
///
/// ## Template Registry
/// [`templates::select_template`] maps a model identifier to its FIM
/// protocol; an instruction-style default guarantees a template for any
/// identifier.
///
/// # Example
///
/// ```ignore
/// use ghostwriter_completion::{InlineCompletionProvider, CompletionQuery, Position, TriggerKind};
/// use ghostwriter_config::CompletionSettings;
/// use ghostwriter_providers::ReplayClient;
/// use std::sync::Arc;
///
/// let client = Arc::new(ReplayClient::from_text("let x = 1;", 4));
/// let provider = InlineCompletionProvider::new(CompletionSettings::default(), client);
///
/// let item = provider.provide_completion(&CompletionQuery {
///     uri: "file:///src/main.rs".into(),
///     text: "fn main() {\n}".into(),
///     language_id: "rust".into(),
///     position: Position::new(0, 11),
///     trigger: TriggerKind::Invoke,
///     typed_prefix: None,
/// }).await;
/// ```
pub mod cache;
pub mod context;
pub mod debounce;
pub mod language;
pub mod prompt;
pub mod provider;
pub mod session;
pub mod snippets;
pub mod stream;
pub mod templates;
pub mod types;

// Re-export public types and traits
pub use cache::CompletionCache;
pub use context::{ContextGatherer, GathererLimits};
pub use debounce::Debouncer;
pub use language::Language;
pub use prompt::{PromptRenderer, RenderOptions};
pub use provider::InlineCompletionProvider;
pub use session::{
    Acceptance, CompletionEvent, CompletionEventSink, CompletionPhase, CompletionSession,
    NullEventSink, NullUiSurface, UiSurface, REDRAW_DEBOUNCE,
};
pub use snippets::{
    ClipboardContents, ClipboardSource, DiffSource, RecentEdit, RecentEditsSource,
    SnippetAssembler, AUX_SOURCE_TIMEOUT,
};
pub use stream::{clean_markdown_artifacts, truncate_at_stop_token, CompletionGenerator};
pub use templates::{select_template, FimTemplate, TemplateBody, TemplateInput};
pub use types::*;
