//! Completion cache
//!
//! A latency shortcut for "nothing relevant changed": one live entry per
//! document, keyed by a hash of the full text, the cursor offset, and the
//! document identity. A hit bypasses context gathering, prompt rendering,
//! and the model client entirely.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// One cached completion for a document
#[derive(Debug, Clone)]
struct CacheEntry {
    text_hash: [u8; 32],
    completion_text: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

/// Single-entry-per-document completion cache
#[derive(Debug, Default)]
pub struct CompletionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CompletionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the cached completion for this exact (text, offset) pair
    pub fn get(&self, document_uri: &str, full_text: &str, cursor_offset: usize) -> Option<String> {
        let hash = Self::key_hash(document_uri, full_text, cursor_offset);
        let entries = self.entries.lock();
        entries
            .get(document_uri)
            .filter(|entry| entry.text_hash == hash)
            .map(|entry| entry.completion_text.clone())
    }

    /// Store a completion, evicting any prior entry for this document
    pub fn set(
        &self,
        document_uri: &str,
        full_text: &str,
        cursor_offset: usize,
        completion_text: String,
    ) {
        let entry = CacheEntry {
            text_hash: Self::key_hash(document_uri, full_text, cursor_offset),
            completion_text,
            created_at: Utc::now(),
        };
        self.entries.lock().insert(document_uri.to_string(), entry);
    }

    /// Drop the entry for a document
    pub fn invalidate(&self, document_uri: &str) {
        self.entries.lock().remove(document_uri);
    }

    fn key_hash(document_uri: &str, full_text: &str, cursor_offset: usize) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(full_text.as_bytes());
        hasher.update((cursor_offset as u64).to_le_bytes());
        hasher.update(document_uri.as_bytes());
        hasher.finalize().into()
    }
}
