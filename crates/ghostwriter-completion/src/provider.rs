//! Inline completion provider façade
//!
//! The single entry point the host editor calls per keystroke or cursor
//! move. Orchestrates the gates (disabled files, minimum typed length,
//! debounce, cache) and on a miss drives the full pipeline: gather
//! context, assemble snippets, select a template, render the prompt, and
//! stream the completion. Returns zero or one completion item; no
//! internal failure ever surfaces as an error.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use ghostwriter_config::{CompletionSettings, MultilineMode};
use ghostwriter_providers::ModelClient;

use crate::cache::CompletionCache;
use crate::context::ContextGatherer;
use crate::debounce::Debouncer;
use crate::language::Language;
use crate::prompt::{PromptRenderer, RenderOptions};
use crate::session::{Acceptance, CompletionEventSink, CompletionSession, UiSurface};
use crate::snippets::SnippetAssembler;
use crate::stream::CompletionGenerator;
use crate::templates::select_template;
use crate::types::{
    CompletionPreview, CompletionQuery, InlineCompletion, Position, TriggerKind, ACCEPT_COMMAND,
};

/// The completion engine façade, one instance per editor pane or window
pub struct InlineCompletionProvider {
    settings: CompletionSettings,
    session: Arc<CompletionSession>,
    generator: CompletionGenerator,
    gatherer: ContextGatherer,
    assembler: SnippetAssembler,
    debouncer: Debouncer,
    cache: CompletionCache,
    disabled_files: GlobSet,
    reponame: String,
    workspace_roots: Vec<String>,
}

impl InlineCompletionProvider {
    /// Create a provider over the given settings and model client
    pub fn new(settings: CompletionSettings, client: Arc<dyn ModelClient>) -> Self {
        let disabled_files = Self::build_glob_set(&settings.disabled_files);
        Self {
            settings,
            session: Arc::new(CompletionSession::default()),
            generator: CompletionGenerator::new(client),
            gatherer: ContextGatherer::new(),
            assembler: SnippetAssembler::new(),
            debouncer: Debouncer::new(),
            cache: CompletionCache::new(),
            disabled_files,
            reponame: String::new(),
            workspace_roots: Vec::new(),
        }
    }

    /// Route lifecycle events and indicator calls to the host editor
    pub fn with_observers(
        mut self,
        events: Arc<dyn CompletionEventSink>,
        ui: Arc<dyn UiSurface>,
    ) -> Self {
        self.session = Arc::new(CompletionSession::new(events, ui));
        self
    }

    /// Use an assembler with auxiliary snippet sources attached
    pub fn with_assembler(mut self, assembler: SnippetAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Set the repository name used by repo-aware templates
    pub fn with_reponame(mut self, reponame: impl Into<String>) -> Self {
        self.reponame = reponame.into();
        self
    }

    /// Set the workspace roots passed to templates
    pub fn with_workspace_roots(mut self, roots: Vec<String>) -> Self {
        self.workspace_roots = roots;
        self
    }

    /// The session, for tests and editor bindings that inspect state
    pub fn session(&self) -> &CompletionSession {
        &self.session
    }

    fn build_glob_set(patterns: &[String]) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => warn!(pattern = %pattern, error = %err, "invalid disabled-file glob"),
            }
        }
        builder.build().unwrap_or_else(|err| {
            warn!(error = %err, "disabled-file globs unusable, disabling none");
            GlobSet::empty()
        })
    }

    /// Produce zero or one completion for this trigger
    pub async fn provide_completion(&self, query: &CompletionQuery) -> Option<InlineCompletion> {
        // a pending remainder is served directly, no model round-trip
        if let Some((id, remainder)) = self.session.pending_remainder() {
            return Some(InlineCompletion {
                insert_text: remainder,
                accept_command: ACCEPT_COMMAND,
                request_id: id,
            });
        }

        let path = Self::uri_to_path(&query.uri);
        if self.disabled_files.is_match(path.as_str()) {
            debug!(uri = %query.uri, "completion disabled for file");
            return None;
        }

        if query.trigger == TriggerKind::Automatic {
            if let Some(typed) = &query.typed_prefix {
                if typed.chars().count() < self.settings.min_typed_length {
                    return None;
                }
            }
        }

        let delay = Duration::from_millis(self.settings.debounce_delay_ms);
        if self.debouncer.should_skip(delay).await {
            return None;
        }

        let offset = Self::byte_offset(&query.text, query.position);
        let two_stage_mode = self.settings.multiline == MultilineMode::TwoStage;

        if let Some(cached) = self.cache.get(&query.uri, &query.text, offset) {
            debug!(uri = %query.uri, "serving cached completion");
            let preview = CompletionPreview::from_cleaned(&cached);
            let id = self.session.begin_request();
            self.session.finish_request(id, preview.clone(), two_stage_mode);
            return Some(InlineCompletion {
                insert_text: Self::insert_text(&preview, two_stage_mode),
                accept_command: ACCEPT_COMMAND,
                request_id: id,
            });
        }

        let id = self.session.begin_request();

        let language = match Language::from_id(&query.language_id) {
            Language::Unknown => Language::from_path(Path::new(&path)),
            known => known,
        };
        let context = self.gatherer.gather(
            &query.text,
            &path,
            query.position,
            language,
            self.settings.include_imports,
            self.settings.include_definitions,
        );
        let snippets = self
            .assembler
            .assemble(&context, &path, self.settings.include_recent_edits)
            .await;
        if !self.session.is_active(id) {
            return None;
        }

        let template = select_template(&self.settings.model);
        let params = self.settings.params_for_model(&self.settings.model);
        let render_options = RenderOptions {
            filepath: path.clone(),
            reponame: self.reponame.clone(),
            language,
            workspace_roots: self.workspace_roots.clone(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let prompt = PromptRenderer::render(&context, &snippets, template, &render_options);

        let text = match self
            .generator
            .generate(id, &self.settings.model, &prompt, &self.session, two_stage_mode)
            .await
        {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(err) => {
                warn!(request = %id, error = %err, "completion failed");
                return None;
            }
        };
        if text.is_empty() {
            self.session.cancel();
            return None;
        }

        self.cache.set(&query.uri, &query.text, offset, text.clone());
        let preview = self.session.preview();
        Some(InlineCompletion {
            insert_text: Self::insert_text(&preview, two_stage_mode),
            accept_command: ACCEPT_COMMAND,
            request_id: id,
        })
    }

    fn insert_text(preview: &CompletionPreview, two_stage_mode: bool) -> String {
        if two_stage_mode && !preview.is_single_line() {
            preview.first_line.clone()
        } else {
            preview.raw_text.clone()
        }
    }

    /// Accept the current preview; returns what to insert
    pub fn accept(&self) -> Option<Acceptance> {
        self.session.accept()
    }

    /// Dismiss the current preview and cancel anything in flight
    pub fn dismiss(&self) {
        self.debouncer.clear();
        self.session.dismiss();
    }

    /// React to a document edit
    ///
    /// The exact insertion of just-accepted text keeps session and cache
    /// alive; any other change cancels the request and invalidates the
    /// document's cache entry.
    pub fn handle_document_change(&self, uri: &str, inserted_text: Option<&str>) {
        if let Some(inserted) = inserted_text {
            if self.session.consume_expected_insertion(inserted) {
                return;
            }
        }
        self.debouncer.clear();
        self.session.cancel();
        self.cache.invalidate(uri);
    }

    /// React to a cursor move; clears the preview but not the cache
    pub fn handle_selection_change(&self) {
        if self.session.take_selection_grace() {
            return;
        }
        self.debouncer.clear();
        self.session.cancel();
    }

    fn uri_to_path(uri: &str) -> String {
        uri.strip_prefix("file://").unwrap_or(uri).to_string()
    }

    /// Byte offset of a line/character position in the document
    fn byte_offset(text: &str, position: Position) -> usize {
        let mut remaining_lines = position.line as usize;
        let mut line_start = 0usize;
        for (index, byte) in text.bytes().enumerate() {
            if remaining_lines == 0 {
                break;
            }
            if byte == b'\n' {
                remaining_lines -= 1;
                line_start = index + 1;
            }
        }
        let line = text[line_start..].split('\n').next().unwrap_or("");
        let character = (position.character as usize).min(line.chars().count());
        let within = line
            .char_indices()
            .nth(character)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        line_start + within
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ghostwriter_providers::{
        GenerationRequest, ProviderError, ReplayClient, TextStream,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings(multiline: MultilineMode) -> CompletionSettings {
        CompletionSettings {
            debounce_delay_ms: 10,
            multiline,
            ..Default::default()
        }
    }

    fn query(text: &str, line: u32, character: u32) -> CompletionQuery {
        CompletionQuery {
            uri: "file:///src/main.rs".to_string(),
            text: text.to_string(),
            language_id: "rust".to_string(),
            position: Position::new(line, character),
            trigger: TriggerKind::Invoke,
            typed_prefix: None,
        }
    }

    /// Counts how often the model client is reached
    struct CountingClient {
        inner: ReplayClient,
        calls: AtomicUsize,
    }

    impl CountingClient {
        fn new(text: &str) -> Self {
            Self {
                inner: ReplayClient::from_text(text, 4),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelClient for CountingClient {
        fn id(&self) -> &str {
            "counting"
        }

        async fn complete(&self, request: GenerationRequest) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.complete(request).await
        }

        async fn complete_stream(
            &self,
            request: GenerationRequest,
        ) -> Result<TextStream, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.complete_stream(request).await
        }
    }

    #[tokio::test]
    async fn test_auto_mode_returns_whole_completion() {
        let client = Arc::new(ReplayClient::from_text("let x = 1;\nlet y = 2;", 5));
        let provider = InlineCompletionProvider::new(settings(MultilineMode::Auto), client);
        let item = provider
            .provide_completion(&query("fn main() {\n}", 0, 11))
            .await
            .unwrap();
        assert_eq!(item.insert_text, "let x = 1;\nlet y = 2;");
        assert_eq!(item.accept_command, ACCEPT_COMMAND);
    }

    #[tokio::test]
    async fn test_two_stage_flow_end_to_end() {
        let client = Arc::new(ReplayClient::from_text("let x = 1;\nlet y = 2;", 5));
        let provider = InlineCompletionProvider::new(settings(MultilineMode::TwoStage), client);
        let uri = "file:///src/main.rs";

        let item = provider
            .provide_completion(&query("fn main() {\n}", 0, 11))
            .await
            .unwrap();
        assert_eq!(item.insert_text, "let x = 1;");

        let first = provider.accept().unwrap();
        assert_eq!(first, Acceptance::FirstLine("let x = 1;".to_string()));

        // the editor inserts the first line and reports the change
        provider.handle_document_change(uri, Some("let x = 1;"));
        provider.handle_selection_change();

        // the next invocation serves the remainder without a model call
        let item = provider
            .provide_completion(&query("fn main() {let x = 1;\n}", 0, 21))
            .await
            .unwrap();
        assert_eq!(item.insert_text, "let y = 2;");

        let second = provider.accept().unwrap();
        assert_eq!(second, Acceptance::Remainder("let y = 2;".to_string()));
    }

    #[tokio::test]
    async fn test_disabled_glob_returns_none() {
        let mut s = settings(MultilineMode::Auto);
        s.disabled_files = vec!["**/*.lock".to_string()];
        let client = Arc::new(ReplayClient::from_text("x", 1));
        let provider = InlineCompletionProvider::new(s, client);
        let mut q = query("content", 0, 0);
        q.uri = "file:///Cargo.lock".to_string();
        assert!(provider.provide_completion(&q).await.is_none());
    }

    #[tokio::test]
    async fn test_min_typed_length_gates_automatic_trigger() {
        let client = Arc::new(CountingClient::new("completion"));
        let provider =
            InlineCompletionProvider::new(settings(MultilineMode::Auto), client.clone());
        let mut q = query("ab", 0, 2);
        q.trigger = TriggerKind::Automatic;
        q.typed_prefix = Some("ab".to_string());
        assert!(provider.provide_completion(&q).await.is_none());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);

        // an explicit invoke ignores the typed-length gate
        q.trigger = TriggerKind::Invoke;
        assert!(provider.provide_completion(&q).await.is_some());
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_model_client() {
        let client = Arc::new(CountingClient::new("cached text"));
        let provider =
            InlineCompletionProvider::new(settings(MultilineMode::Auto), client.clone());
        let q = query("fn main() {}", 0, 11);

        let first = provider.provide_completion(&q).await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        let second = provider.provide_completion(&q).await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.insert_text, second.insert_text);
    }

    #[tokio::test]
    async fn test_edit_invalidates_cache() {
        let client = Arc::new(CountingClient::new("cached text"));
        let provider =
            InlineCompletionProvider::new(settings(MultilineMode::Auto), client.clone());
        let q = query("fn main() {}", 0, 11);

        provider.provide_completion(&q).await.unwrap();
        provider.handle_document_change(&q.uri, Some("zzz"));
        provider.provide_completion(&q).await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_triggers_coalesce_to_last() {
        let client = Arc::new(ReplayClient::from_text("result", 3));
        let provider = Arc::new(InlineCompletionProvider::new(
            settings(MultilineMode::Auto),
            client,
        ));

        let first = tokio::spawn({
            let provider = provider.clone();
            async move { provider.provide_completion(&query("fn a() {}", 0, 8)).await }
        });
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = tokio::spawn({
            let provider = provider.clone();
            async move { provider.provide_completion(&query("fn ab() {}", 0, 9)).await }
        });

        assert!(first.await.unwrap().is_none());
        assert!(second.await.unwrap().is_some());
    }

    #[test]
    fn test_byte_offset_multiline() {
        let text = "ab\ncdé\nf";
        assert_eq!(
            InlineCompletionProvider::byte_offset(text, Position::new(0, 0)),
            0
        );
        assert_eq!(
            InlineCompletionProvider::byte_offset(text, Position::new(1, 2)),
            5
        );
        // é is two bytes wide
        assert_eq!(
            InlineCompletionProvider::byte_offset(text, Position::new(1, 3)),
            7
        );
        assert_eq!(
            InlineCompletionProvider::byte_offset(text, Position::new(2, 0)),
            8
        );
        // out of range clamps to line end
        assert_eq!(
            InlineCompletionProvider::byte_offset(text, Position::new(2, 99)),
            9
        );
    }
}
