//! Snippet assembly
//!
//! Turns a gathered [`CodeContext`] plus auxiliary sources (clipboard,
//! working-tree diff, recently edited ranges) into the ordered snippet list
//! templates consume. Primary snippets are deterministic: imports first in
//! source order, then definitions in source order. Auxiliary sources are
//! external capabilities raced against a strict timeout; on timeout or
//! failure they contribute nothing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{CodeContext, Snippet};

/// Upper bound on any auxiliary source fetch
pub const AUX_SOURCE_TIMEOUT: Duration = Duration::from_millis(100);

/// Clipboard contents with the time of the copy
#[derive(Debug, Clone)]
pub struct ClipboardContents {
    pub content: String,
    pub copied_at: DateTime<Utc>,
}

/// A recently edited range of some file
#[derive(Debug, Clone)]
pub struct RecentEdit {
    pub filepath: String,
    pub content: String,
}

/// Capability: read the system clipboard
#[async_trait]
pub trait ClipboardSource: Send + Sync {
    async fn current(&self) -> Option<ClipboardContents>;
}

/// Capability: read the working-tree diff
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn working_tree_diff(&self) -> Option<String>;
}

/// Capability: report recently edited ranges
#[async_trait]
pub trait RecentEditsSource: Send + Sync {
    async fn recent_edits(&self) -> Vec<RecentEdit>;
}

/// Assembles the ordered snippet list for one request
#[derive(Default)]
pub struct SnippetAssembler {
    clipboard: Option<Arc<dyn ClipboardSource>>,
    diff: Option<Arc<dyn DiffSource>>,
    recent_edits: Option<Arc<dyn RecentEditsSource>>,
}

impl SnippetAssembler {
    /// Create an assembler with no auxiliary sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a clipboard source
    pub fn with_clipboard_source(mut self, source: Arc<dyn ClipboardSource>) -> Self {
        self.clipboard = Some(source);
        self
    }

    /// Attach a working-tree diff source
    pub fn with_diff_source(mut self, source: Arc<dyn DiffSource>) -> Self {
        self.diff = Some(source);
        self
    }

    /// Attach a recent-edits source
    pub fn with_recent_edits_source(mut self, source: Arc<dyn RecentEditsSource>) -> Self {
        self.recent_edits = Some(source);
        self
    }

    /// Build the snippet list: imports, definitions, then auxiliary sources
    ///
    /// Never blocks longer than [`AUX_SOURCE_TIMEOUT`] beyond the primary
    /// (purely synchronous) assembly.
    pub async fn assemble(
        &self,
        context: &CodeContext,
        current_filepath: &str,
        include_recent_edits: bool,
    ) -> Vec<Snippet> {
        let mut snippets = Vec::new();

        for (index, import) in context.imports.iter().enumerate() {
            snippets.push(Snippet::Context {
                filepath: format!("context://imports/{}#{}", current_filepath, index),
                content: import.clone(),
            });
        }

        for definition in &context.definitions {
            snippets.push(Snippet::Code {
                filepath: definition.filepath.clone(),
                content: definition.content.clone(),
            });
        }

        if include_recent_edits {
            if let Some(source) = &self.recent_edits {
                for edit in Self::fetch_recent_edits(source.as_ref()).await {
                    snippets.push(Snippet::Code {
                        filepath: edit.filepath,
                        content: edit.content,
                    });
                }
            }
        }

        if let Some(source) = &self.clipboard {
            if let Some(clipboard) = Self::fetch_clipboard(source.as_ref()).await {
                snippets.push(Snippet::Clipboard {
                    content: clipboard.content,
                    copied_at: clipboard.copied_at,
                });
            }
        }

        if let Some(source) = &self.diff {
            if let Some(diff) = Self::fetch_diff(source.as_ref()).await {
                if !diff.trim().is_empty() {
                    snippets.push(Snippet::Diff { content: diff });
                }
            }
        }

        snippets
    }

    async fn fetch_recent_edits(source: &dyn RecentEditsSource) -> Vec<RecentEdit> {
        match tokio::time::timeout(AUX_SOURCE_TIMEOUT, source.recent_edits()).await {
            Ok(edits) => edits,
            Err(_) => {
                debug!("recent-edits source timed out");
                Vec::new()
            }
        }
    }

    async fn fetch_clipboard(source: &dyn ClipboardSource) -> Option<ClipboardContents> {
        match tokio::time::timeout(AUX_SOURCE_TIMEOUT, source.current()).await {
            Ok(contents) => contents,
            Err(_) => {
                debug!("clipboard source timed out");
                None
            }
        }
    }

    async fn fetch_diff(source: &dyn DiffSource) -> Option<String> {
        match tokio::time::timeout(AUX_SOURCE_TIMEOUT, source.working_tree_diff()).await {
            Ok(diff) => diff,
            Err(_) => {
                debug!("diff source timed out");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Definition;

    struct SlowClipboard;

    #[async_trait]
    impl ClipboardSource for SlowClipboard {
        async fn current(&self) -> Option<ClipboardContents> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Some(ClipboardContents {
                content: "too late".to_string(),
                copied_at: Utc::now(),
            })
        }
    }

    struct FastDiff;

    #[async_trait]
    impl DiffSource for FastDiff {
        async fn working_tree_diff(&self) -> Option<String> {
            Some("+added line".to_string())
        }
    }

    fn context_with_imports_and_defs() -> CodeContext {
        CodeContext {
            imports: vec!["use std::io;".to_string(), "use std::fmt;".to_string()],
            definitions: vec![Definition {
                filepath: "src/lib.rs".to_string(),
                content: "fn helper() {}".to_string(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_imports_then_definitions_in_order() {
        let assembler = SnippetAssembler::new();
        let snippets = assembler
            .assemble(&context_with_imports_and_defs(), "src/main.rs", false)
            .await;

        assert_eq!(snippets.len(), 3);
        assert_eq!(
            snippets[0],
            Snippet::Context {
                filepath: "context://imports/src/main.rs#0".to_string(),
                content: "use std::io;".to_string(),
            }
        );
        assert_eq!(
            snippets[1],
            Snippet::Context {
                filepath: "context://imports/src/main.rs#1".to_string(),
                content: "use std::fmt;".to_string(),
            }
        );
        assert_eq!(
            snippets[2],
            Snippet::Code {
                filepath: "src/lib.rs".to_string(),
                content: "fn helper() {}".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_contributes_nothing() {
        let assembler = SnippetAssembler::new()
            .with_clipboard_source(Arc::new(SlowClipboard))
            .with_diff_source(Arc::new(FastDiff));
        let snippets = assembler
            .assemble(&CodeContext::default(), "src/main.rs", false)
            .await;

        // the slow clipboard is dropped, the fast diff survives
        assert_eq!(
            snippets,
            vec![Snippet::Diff {
                content: "+added line".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_no_sources_yields_primary_only() {
        let assembler = SnippetAssembler::new();
        let snippets = assembler
            .assemble(&CodeContext::default(), "src/main.rs", true)
            .await;
        assert!(snippets.is_empty());
    }
}
