//! Context gathering around the cursor
//!
//! Reads a bounded window of the document, splits the current line at the
//! cursor, and optionally scans for import-like statements and definitions
//! of symbols referenced near the cursor. Everything here is line-based
//! string processing: an unparsable file degrades to "no imports, no
//! definitions", it never fails the request.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::language::Language;
use crate::types::{CodeContext, Definition, Position};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]{2,}").expect("identifier regex"));

/// Window bounds for the gathered context
#[derive(Debug, Clone, Copy)]
pub struct GathererLimits {
    /// Lines kept before the current line
    pub max_preceding_lines: usize,
    /// Lines kept after the current line
    pub max_following_lines: usize,
    /// Definitions resolved per request
    pub max_definitions: usize,
    /// Lines scanned around the cursor for referenced identifiers
    pub reference_window: usize,
}

impl Default for GathererLimits {
    fn default() -> Self {
        Self {
            max_preceding_lines: 100,
            max_following_lines: 50,
            max_definitions: 5,
            reference_window: 2,
        }
    }
}

/// Produces a [`CodeContext`] for one completion request
#[derive(Debug, Clone, Default)]
pub struct ContextGatherer {
    limits: GathererLimits,
}

impl ContextGatherer {
    /// Create a gatherer with default window bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gatherer with custom bounds
    pub fn with_limits(limits: GathererLimits) -> Self {
        Self { limits }
    }

    /// Gather context around the cursor
    ///
    /// The cursor position is clamped into the document, so a stale
    /// position from a racing edit yields a usable (if slightly off)
    /// context instead of an error.
    pub fn gather(
        &self,
        text: &str,
        filepath: &str,
        position: Position,
        language: Language,
        include_imports: bool,
        include_definitions: bool,
    ) -> CodeContext {
        let lines: Vec<&str> = text.split('\n').collect();
        let line_index = (position.line as usize).min(lines.len().saturating_sub(1));
        let current = lines.get(line_index).copied().unwrap_or("");

        let split_at = (position.character as usize).min(current.chars().count());
        let byte_split = current
            .char_indices()
            .nth(split_at)
            .map(|(i, _)| i)
            .unwrap_or(current.len());
        let (before_cursor, after_cursor) = current.split_at(byte_split);

        let preceding_start = line_index.saturating_sub(self.limits.max_preceding_lines);
        let preceding_lines: Vec<String> = lines[preceding_start..line_index]
            .iter()
            .map(|l| l.to_string())
            .collect();
        let following_end = (line_index + 1 + self.limits.max_following_lines).min(lines.len());
        let following_lines: Vec<String> = lines[(line_index + 1).min(lines.len())..following_end]
            .iter()
            .map(|l| l.to_string())
            .collect();

        let imports = if include_imports {
            self.scan_imports(&lines, language)
        } else {
            Vec::new()
        };

        let definitions = if include_definitions {
            self.resolve_definitions(&lines, line_index, filepath, language)
        } else {
            Vec::new()
        };

        CodeContext {
            current_line: before_cursor.to_string(),
            current_line_suffix: after_cursor.to_string(),
            preceding_lines,
            following_lines,
            imports,
            definitions,
        }
    }

    /// Collect import-like statements in source order
    fn scan_imports(&self, lines: &[&str], language: Language) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| Self::is_import_line(l, language))
            .map(|l| l.to_string())
            .collect()
    }

    fn is_import_line(trimmed: &str, language: Language) -> bool {
        language.import_prefixes().iter().any(|prefix| {
            if !trimmed.starts_with(prefix) {
                return false;
            }
            // "const x = require(...)" is the only prefix that needs a
            // second look; a bare "const" is not an import
            *prefix != "const " || trimmed.contains("require(")
        })
    }

    /// Resolve definitions of identifiers referenced near the cursor
    ///
    /// Identifiers are taken from a few lines around the cursor, then
    /// matched against definition-introducing lines elsewhere in the file.
    fn resolve_definitions(
        &self,
        lines: &[&str],
        line_index: usize,
        filepath: &str,
        language: Language,
    ) -> Vec<Definition> {
        let window_start = line_index.saturating_sub(self.limits.reference_window);
        let window_end = (line_index + self.limits.reference_window + 1).min(lines.len());

        let mut referenced: HashSet<&str> = HashSet::new();
        for line in &lines[window_start..window_end] {
            for m in IDENTIFIER_RE.find_iter(line) {
                referenced.insert(m.as_str());
            }
        }
        if referenced.is_empty() {
            return Vec::new();
        }

        let mut definitions = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            if definitions.len() >= self.limits.max_definitions {
                break;
            }
            // the reference window defines the symbols, not the definitions
            if index >= window_start && index < window_end {
                continue;
            }
            if let Some(name) = Self::defined_symbol(line, language) {
                if referenced.contains(name) {
                    definitions.push(Definition {
                        filepath: filepath.to_string(),
                        content: line.trim_end().to_string(),
                    });
                }
            }
        }
        definitions
    }

    /// The symbol a line defines, if it is a definition line
    fn defined_symbol<'a>(line: &'a str, language: Language) -> Option<&'a str> {
        let trimmed = line.trim_start();
        let without_modifiers = trimmed
            .trim_start_matches("pub ")
            .trim_start_matches("pub(crate) ")
            .trim_start_matches("export ")
            .trim_start_matches("default ")
            .trim_start_matches("async ")
            .trim_start_matches("static ");

        let mut parts = without_modifiers.split_whitespace();
        let keyword = parts.next()?;
        if !language.definition_keywords().contains(&keyword) {
            return None;
        }
        let candidate = parts.next()?;
        let name = IDENTIFIER_RE.find(candidate)?;
        // the identifier must lead the token ("fn 3x" or "fn (x)" are not definitions)
        if name.start() != 0 {
            return None;
        }
        Some(name.as_str())
    }
}
