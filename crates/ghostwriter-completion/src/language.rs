use std::path::Path;

/// Language identification for completion requests
///
/// The editor supplies a language identifier with every trigger; extension
/// detection is the fallback when it does not. The comment markers feed the
/// language-derived stop tokens appended by the prompt renderer.
use serde::{Deserialize, Serialize};

/// Languages the engine knows comment conventions for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Rust programming language
    Rust,
    /// TypeScript/JavaScript programming language
    TypeScript,
    /// Python programming language
    Python,
    /// Go programming language
    Go,
    /// Java programming language
    Java,
    /// Kotlin programming language
    Kotlin,
    /// Dart programming language
    Dart,
    /// Unknown or unsupported language
    Unknown,
}

impl Language {
    /// Resolve a language from an editor-supplied identifier
    ///
    /// Accepts the common aliases editors use ("js", "ts", "golang", ...).
    pub fn from_id(id: &str) -> Self {
        match id.to_lowercase().as_str() {
            "rust" | "rs" => Language::Rust,
            "typescript" | "typescriptreact" | "javascript" | "javascriptreact" | "ts" | "js" => {
                Language::TypeScript
            }
            "python" | "py" => Language::Python,
            "go" | "golang" => Language::Go,
            "java" => Language::Java,
            "kotlin" | "kt" => Language::Kotlin,
            "dart" => Language::Dart,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "ts" | "tsx" | "js" | "jsx" => Language::TypeScript,
            "py" => Language::Python,
            "go" => Language::Go,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "dart" => Language::Dart,
            _ => Language::Unknown,
        }
    }

    /// Detect language from a file path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Language::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Convert language to string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Dart => "dart",
            Language::Unknown => "unknown",
        }
    }

    /// Line comment marker for this language
    ///
    /// `Unknown` gets the C-family marker; a wrong marker only weakens a
    /// stop token, it never corrupts a prompt.
    pub fn line_comment(&self) -> &'static str {
        match self {
            Language::Python => "#",
            _ => "//",
        }
    }

    /// Prefixes that introduce an import-like statement in this language
    pub fn import_prefixes(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["use ", "extern crate "],
            Language::TypeScript => &["import ", "const ", "require("],
            Language::Python => &["import ", "from "],
            Language::Go => &["import "],
            Language::Java => &["import "],
            Language::Kotlin => &["import "],
            Language::Dart => &["import ", "export ", "part "],
            Language::Unknown => &["import ", "use ", "from ", "#include "],
        }
    }

    /// Keywords that introduce a definition in this language
    pub fn definition_keywords(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["fn", "struct", "enum", "trait", "impl", "const", "static"],
            Language::TypeScript => &["function", "class", "interface", "const", "enum", "type"],
            Language::Python => &["def", "class"],
            Language::Go => &["func", "type", "const", "var"],
            Language::Java => &["class", "interface", "enum", "record"],
            Language::Kotlin => &["fun", "class", "object", "interface", "val"],
            Language::Dart => &["class", "enum", "void", "mixin"],
            Language::Unknown => &["fn", "function", "def", "class", "func"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_id() {
        assert_eq!(Language::from_id("rust"), Language::Rust);
        assert_eq!(Language::from_id("TypeScript"), Language::TypeScript);
        assert_eq!(Language::from_id("javascriptreact"), Language::TypeScript);
        assert_eq!(Language::from_id("golang"), Language::Go);
        assert_eq!(Language::from_id("brainfuck"), Language::Unknown);
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("tsx"), Language::TypeScript);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("kts"), Language::Kotlin);
        assert_eq!(Language::from_extension("unknown"), Language::Unknown);
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("src/main.rs")), Language::Rust);
        assert_eq!(Language::from_path(Path::new("noext")), Language::Unknown);
    }

    #[test]
    fn test_line_comment_markers() {
        assert_eq!(Language::Rust.line_comment(), "//");
        assert_eq!(Language::Python.line_comment(), "#");
        assert_eq!(Language::Unknown.line_comment(), "//");
    }
}
