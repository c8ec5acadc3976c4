//! Fill-in-middle template registry
//!
//! Maps a model identifier to the FIM protocol that model was trained on:
//! the prompt shape, its stop tokens, and (for repo-aware models) a
//! multi-file prefix/suffix compiler. Selection is a fixed, ordered list of
//! case-insensitive substring rules; the first match wins and an
//! instruction-style default guarantees selection never fails.

use crate::types::Snippet;

/// Everything a template may consult while rendering
#[derive(Debug, Clone, Copy)]
pub struct TemplateInput<'a> {
    /// Text before the cursor
    pub prefix: &'a str,
    /// Text after the cursor, never empty
    pub suffix: &'a str,
    /// Path of the current file
    pub filepath: &'a str,
    /// Repository name
    pub reponame: &'a str,
    /// Language identifier
    pub language: &'a str,
    /// Assembled context snippets, in assembly order
    pub snippets: &'a [Snippet],
    /// Workspace root paths
    pub workspace_roots: &'a [String],
}

/// Template body: a literal with placeholders, or a render function
pub enum TemplateBody {
    /// Text with `{{{prefix}}}`-style placeholders
    Literal(&'static str),
    /// Render function for prompts a literal cannot express
    Function(fn(&TemplateInput<'_>) -> String),
}

/// A fill-in-middle template, immutable and process-wide
pub struct FimTemplate {
    /// Stable identifier, used in logs and tests
    pub id: &'static str,
    /// How the final prompt is produced
    pub body: TemplateBody,
    /// Stop tokens fixed by this template
    pub stop_tokens: &'static [&'static str],
    /// Optional multi-file prefix/suffix compiler
    ///
    /// When present, the renderer calls this instead of prepending
    /// comment-formatted snippets to the prefix.
    pub compile_prefix_suffix: Option<fn(&TemplateInput<'_>) -> (String, String)>,
}

impl FimTemplate {
    /// Render the final prompt for this template
    pub fn render(&self, input: &TemplateInput<'_>) -> String {
        match &self.body {
            TemplateBody::Literal(text) => text
                .replace("{{{prefix}}}", input.prefix)
                .replace("{{{suffix}}}", input.suffix)
                .replace("{{{filename}}}", input.filepath)
                .replace("{{{reponame}}}", input.reponame)
                .replace("{{{language}}}", input.language),
            TemplateBody::Function(render) => render(input),
        }
    }
}

/// Qwen-style repo-level prefix: `<|repo_name|>` then one `<|file_sep|>`
/// section per snippet, the current file last
fn compile_qwen_repo(input: &TemplateInput<'_>) -> (String, String) {
    let mut prefix = String::new();
    prefix.push_str("<|repo_name|>");
    prefix.push_str(input.reponame);
    prefix.push('\n');
    for snippet in input.snippets {
        prefix.push_str("<|file_sep|>");
        prefix.push_str(snippet.filepath());
        prefix.push('\n');
        prefix.push_str(snippet.content());
        if !snippet.content().ends_with('\n') {
            prefix.push('\n');
        }
    }
    prefix.push_str("<|file_sep|>");
    prefix.push_str(input.filepath);
    prefix.push('\n');
    prefix.push_str(input.prefix);
    (prefix, input.suffix.to_string())
}

/// StarCoder-style multi-file prefix using `<filename>` separators
fn compile_starcoder_repo(input: &TemplateInput<'_>) -> (String, String) {
    let mut prefix = String::new();
    for snippet in input.snippets {
        prefix.push_str("<filename>");
        prefix.push_str(snippet.filepath());
        prefix.push('\n');
        prefix.push_str(snippet.content());
        if !snippet.content().ends_with('\n') {
            prefix.push('\n');
        }
    }
    prefix.push_str("<filename>");
    prefix.push_str(input.filepath);
    prefix.push('\n');
    prefix.push_str(input.prefix);
    (prefix, input.suffix.to_string())
}

/// CodeGemma-style multi-file prefix using `<|file_separator|>` sections
fn compile_codegemma_repo(input: &TemplateInput<'_>) -> (String, String) {
    let mut prefix = String::new();
    for snippet in input.snippets {
        prefix.push_str("<|file_separator|>");
        prefix.push_str(snippet.filepath());
        prefix.push('\n');
        prefix.push_str(snippet.content());
        if !snippet.content().ends_with('\n') {
            prefix.push('\n');
        }
    }
    if !input.snippets.is_empty() {
        prefix.push_str("<|file_separator|>");
        prefix.push_str(input.filepath);
        prefix.push('\n');
    }
    prefix.push_str(input.prefix);
    (prefix, input.suffix.to_string())
}

/// Instruct templates lay out snippets themselves, so prefix and suffix
/// pass through unchanged
fn compile_passthrough(input: &TemplateInput<'_>) -> (String, String) {
    (input.prefix.to_string(), input.suffix.to_string())
}

/// Instruction prompt for chat-tuned models with no FIM vocabulary
///
/// These models answer in markdown, which is why the stream processor
/// strips code fences as chunks arrive.
fn render_instruct(input: &TemplateInput<'_>) -> String {
    let mut out = String::new();
    out.push_str("Complete the code at <CURSOR>. Reply with only the code that replaces <CURSOR>, without explanations.\n");
    for snippet in input.snippets {
        out.push_str("Context from ");
        out.push_str(snippet.filepath());
        out.push_str(":\n```");
        out.push_str(input.language);
        out.push('\n');
        out.push_str(snippet.content());
        if !snippet.content().ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n");
    }
    out.push_str("File ");
    out.push_str(input.filepath);
    out.push_str(":\n```");
    out.push_str(input.language);
    out.push('\n');
    out.push_str(input.prefix);
    out.push_str("<CURSOR>");
    out.push_str(input.suffix);
    if !input.suffix.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```");
    out
}

static QWEN_CODER: FimTemplate = FimTemplate {
    id: "qwen-coder",
    body: TemplateBody::Literal(
        "<|fim_prefix|>{{{prefix}}}<|fim_suffix|>{{{suffix}}}<|fim_middle|>",
    ),
    stop_tokens: &[
        "<|endoftext|>",
        "<|fim_prefix|>",
        "<|fim_suffix|>",
        "<|fim_middle|>",
        "<|repo_name|>",
        "<|file_sep|>",
    ],
    compile_prefix_suffix: Some(compile_qwen_repo),
};

static CODESTRAL_GEMINI: FimTemplate = FimTemplate {
    id: "codestral-gemini-instruct",
    body: TemplateBody::Function(render_instruct),
    stop_tokens: &[],
    compile_prefix_suffix: Some(compile_passthrough),
};

static DEEPSEEK: FimTemplate = FimTemplate {
    id: "deepseek-coder",
    body: TemplateBody::Literal(
        "<\u{ff5c}fim\u{2581}begin\u{ff5c}>{{{prefix}}}<\u{ff5c}fim\u{2581}hole\u{ff5c}>{{{suffix}}}<\u{ff5c}fim\u{2581}end\u{ff5c}>",
    ),
    stop_tokens: &[
        "<\u{ff5c}fim\u{2581}begin\u{ff5c}>",
        "<\u{ff5c}fim\u{2581}hole\u{ff5c}>",
        "<\u{ff5c}fim\u{2581}end\u{ff5c}>",
        "<|EOT|>",
    ],
    compile_prefix_suffix: None,
};

static STARCODER: FimTemplate = FimTemplate {
    id: "starcoder",
    body: TemplateBody::Literal("<fim_prefix>{{{prefix}}}<fim_suffix>{{{suffix}}}<fim_middle>"),
    stop_tokens: &[
        "<|endoftext|>",
        "<fim_prefix>",
        "<fim_suffix>",
        "<fim_middle>",
        "<file_sep>",
    ],
    compile_prefix_suffix: Some(compile_starcoder_repo),
};

static CODELLAMA: FimTemplate = FimTemplate {
    id: "codellama",
    body: TemplateBody::Literal(" <PRE> {{{prefix}}} <SUF>{{{suffix}}} <MID>"),
    stop_tokens: &["<END>", "<EOT>", " <MID>", " <PRE>", " <SUF>"],
    compile_prefix_suffix: None,
};

static CODEGEMMA: FimTemplate = FimTemplate {
    id: "codegemma",
    body: TemplateBody::Literal(
        "<|fim_prefix|>{{{prefix}}}<|fim_suffix|>{{{suffix}}}<|fim_middle|>",
    ),
    stop_tokens: &[
        "<|fim_prefix|>",
        "<|fim_suffix|>",
        "<|fim_middle|>",
        "<|file_separator|>",
        "<end_of_turn>",
    ],
    compile_prefix_suffix: Some(compile_codegemma_repo),
};

static DEFAULT: FimTemplate = FimTemplate {
    id: "default-instruct",
    body: TemplateBody::Function(render_instruct),
    stop_tokens: &[],
    compile_prefix_suffix: Some(compile_passthrough),
};

/// Select the template for a model identifier
///
/// Rules are evaluated top to bottom over the lowercased identifier; the
/// first match wins. Unrecognized identifiers get the default template,
/// never an error.
pub fn select_template(model_identifier: &str) -> &'static FimTemplate {
    let id = model_identifier.to_lowercase();
    if id.contains("qwen") && id.contains("coder") {
        &QWEN_CODER
    } else if id.contains("codestral") || id.contains("gemini") {
        &CODESTRAL_GEMINI
    } else if id.contains("deepseek") {
        &DEEPSEEK
    } else if id.contains("starcoder") || id.contains("santacoder") {
        &STARCODER
    } else if id.contains("codellama") || (id.contains("code") && id.contains("llama")) {
        &CODELLAMA
    } else if id.contains("codegemma") {
        &CODEGEMMA
    } else {
        &DEFAULT
    }
}
