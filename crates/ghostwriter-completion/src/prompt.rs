//! Prompt rendering
//!
//! Combines the gathered context, assembled snippets, and the selected
//! template into the final prompt string plus resolved generation options.
//! Rendering is pure: same inputs, same prompt, no side effects.

use crate::language::Language;
use crate::templates::{FimTemplate, TemplateInput};
use crate::types::{CodeContext, GenerationOptions, PromptResult, Snippet};

/// Per-request rendering inputs that do not come from the document
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Path of the current file
    pub filepath: String,
    /// Repository name
    pub reponame: String,
    /// Active language
    pub language: Language,
    /// Workspace root paths
    pub workspace_roots: Vec<String>,
    /// Sampling temperature for this request
    pub temperature: Option<f32>,
    /// Generation budget for this request
    pub max_tokens: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            filepath: String::new(),
            reponame: String::new(),
            language: Language::Unknown,
            workspace_roots: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Renders the final prompt for one request
pub struct PromptRenderer;

impl PromptRenderer {
    /// Render context + snippets through the template
    ///
    /// Steps, in order: build prefix, build suffix (never empty), compile
    /// or fall back to comment-rendered snippets, render the template,
    /// resolve stop tokens.
    pub fn render(
        context: &CodeContext,
        snippets: &[Snippet],
        template: &FimTemplate,
        options: &RenderOptions,
    ) -> PromptResult {
        let mut prefix = String::new();
        for line in &context.preceding_lines {
            prefix.push_str(line);
            prefix.push('\n');
        }
        prefix.push_str(&context.current_line);

        let mut suffix = context.current_line_suffix.clone();
        for line in &context.following_lines {
            suffix.push('\n');
            suffix.push_str(line);
        }
        if suffix.is_empty() {
            // templates must never see an empty suffix
            suffix.push('\n');
        }

        let base_input = TemplateInput {
            prefix: &prefix,
            suffix: &suffix,
            filepath: &options.filepath,
            reponame: &options.reponame,
            language: options.language.as_str(),
            snippets,
            workspace_roots: &options.workspace_roots,
        };

        let (prefix, suffix) = match template.compile_prefix_suffix {
            Some(compile) => compile(&base_input),
            None => (
                Self::snippets_as_comments(snippets, options.language, &prefix),
                suffix.clone(),
            ),
        };

        let input = TemplateInput {
            prefix: &prefix,
            suffix: &suffix,
            ..base_input
        };
        let prompt = template.render(&input);

        let mut stop_tokens: Vec<String> = template
            .stop_tokens
            .iter()
            .map(|t| t.to_string())
            .collect();
        stop_tokens.push(format!("\n{}", options.language.line_comment()));

        PromptResult {
            prompt,
            prefix,
            suffix,
            options: GenerationOptions {
                stop_tokens,
                temperature: options.temperature,
                max_tokens: options.max_tokens,
            },
        }
    }

    /// Fallback snippet rendering: each snippet under a path comment,
    /// prepended to the prefix
    fn snippets_as_comments(snippets: &[Snippet], language: Language, prefix: &str) -> String {
        if snippets.is_empty() {
            return prefix.to_string();
        }
        let comment = language.line_comment();
        let mut out = String::new();
        for snippet in snippets {
            out.push_str(comment);
            out.push_str(" Path: ");
            out.push_str(snippet.filepath());
            out.push('\n');
            out.push_str(snippet.content());
            if !snippet.content().ends_with('\n') {
                out.push('\n');
            }
        }
        out.push('\n');
        out.push_str(prefix);
        out
    }
}
