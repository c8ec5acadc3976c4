//! Stream processing
//!
//! Consumes the model client's chunk stream, cleans markdown code-fence
//! artifacts as they arrive, splits the accumulated text into the
//! first-line/remainder preview pair, and applies every update through the
//! session so superseded requests mutate nothing. Model client failures
//! resolve to "no completion"; they never escape as errors.

use std::sync::Arc;

use futures::stream::{AbortHandle, Abortable};
use futures::StreamExt;
use tracing::debug;

use ghostwriter_providers::{GenerationRequest, ModelClient};

use crate::session::CompletionSession;
use crate::types::{CompletionPreview, CompletionResult, PromptResult, RequestId};

/// Strip markdown code-fence artifacts from accumulated text
///
/// Fixed substitutions: an opening triple-backtick fence (with or without
/// a language tag) at the start, a closing fence at the end, and trailing
/// newlines. Cleaning an already-clean string returns it unchanged.
pub fn clean_markdown_artifacts(text: &str) -> String {
    let mut cleaned: &str = text;

    // every substitution strictly shrinks the text, so this terminates
    loop {
        let mut changed = false;

        let lead = cleaned.trim_start_matches(['\n', '\r']);
        if lead.starts_with("```") {
            // drop the fence line; mid-stream there may be nothing after it yet
            cleaned = match lead.find('\n') {
                Some(index) => &lead[index + 1..],
                None => "",
            };
            changed = true;
        }

        let tail = cleaned.trim_end();
        if tail.ends_with("```") {
            cleaned = &tail[..tail.len() - 3];
            changed = true;
        }

        let trimmed = cleaned.trim_end_matches(['\n', '\r']);
        if trimmed.len() != cleaned.len() {
            cleaned = trimmed;
            changed = true;
        }

        if !changed {
            return cleaned.to_string();
        }
    }
}

/// Cut the text at the earliest stop token occurrence
///
/// Returns the (possibly truncated) text and whether a stop token was hit.
pub fn truncate_at_stop_token(text: &str, stop_tokens: &[String]) -> (String, bool) {
    let earliest = stop_tokens
        .iter()
        .filter(|token| !token.is_empty())
        .filter_map(|token| text.find(token.as_str()))
        .min();
    match earliest {
        Some(index) => (text[..index].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Drives one generation request through the model client
pub struct CompletionGenerator {
    client: Arc<dyn ModelClient>,
}

impl CompletionGenerator {
    /// Create a generator over the given client
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    /// Generate the completion for a rendered prompt
    ///
    /// Returns the final cleaned text; `Ok(None)` when the request was
    /// superseded, cancelled, or aborted. Client failures come back as
    /// errors for the façade to log and resolve to "no completion". The
    /// session receives every preview update and the final split.
    pub async fn generate(
        &self,
        id: RequestId,
        model: &str,
        prompt: &PromptResult,
        session: &CompletionSession,
        two_stage: bool,
    ) -> CompletionResult<Option<String>> {
        let request = GenerationRequest::new(model, prompt.prompt.clone())
            .with_stop_tokens(prompt.options.stop_tokens.clone());
        let request = match prompt.options.temperature {
            Some(temperature) => request.with_temperature(temperature),
            None => request,
        };
        let request = match prompt.options.max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        };

        let accumulated = if self.client.supports_streaming() {
            match self.consume_stream(id, request, prompt, session).await? {
                Some(text) => text,
                None => return Ok(None),
            }
        } else {
            match self.client.complete(request).await {
                Ok(text) => text,
                Err(err) if err.is_abort() => {
                    debug!(request = %id, "completion aborted");
                    return Ok(None);
                }
                Err(err) => {
                    session.fail_request(id);
                    return Err(err.into());
                }
            }
        };

        if !session.is_active(id) {
            debug!(request = %id, "request superseded before finish");
            return Ok(None);
        }

        let cleaned = clean_markdown_artifacts(&accumulated);
        let (final_text, _) = truncate_at_stop_token(&cleaned, &prompt.options.stop_tokens);
        let preview = CompletionPreview::from_cleaned(&final_text);
        if !session.finish_request(id, preview, two_stage) {
            return Ok(None);
        }
        Ok(Some(final_text))
    }

    /// Read the chunk stream, applying cleaned previews as chunks arrive
    async fn consume_stream(
        &self,
        id: RequestId,
        request: GenerationRequest,
        prompt: &PromptResult,
        session: &CompletionSession,
    ) -> CompletionResult<Option<String>> {
        let stream = match self.client.complete_stream(request).await {
            Ok(stream) => stream,
            Err(err) => {
                session.fail_request(id);
                return Err(err.into());
            }
        };

        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        session.attach_abort(id, abort_handle);
        let mut stream = Abortable::new(stream, abort_registration);

        let mut accumulated = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if !session.is_active(id) {
                        debug!(request = %id, "request superseded mid-stream");
                        return Ok(None);
                    }
                    accumulated.push_str(&chunk);
                    let cleaned = clean_markdown_artifacts(&accumulated);
                    let (visible, hit_stop) =
                        truncate_at_stop_token(&cleaned, &prompt.options.stop_tokens);
                    session.update_preview(id, CompletionPreview::from_cleaned(&visible));
                    if hit_stop {
                        break;
                    }
                }
                Err(err) if err.is_abort() => {
                    debug!(request = %id, "stream aborted");
                    return Ok(None);
                }
                Err(err) => {
                    session.fail_request(id);
                    return Err(err.into());
                }
            }
        }

        Ok(Some(accumulated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostwriter_providers::ReplayClient;

    use crate::types::GenerationOptions;

    fn prompt_result(stop_tokens: Vec<String>) -> PromptResult {
        PromptResult {
            prompt: "<|fim_prefix|>x<|fim_suffix|>y<|fim_middle|>".to_string(),
            prefix: "x".to_string(),
            suffix: "y".to_string(),
            options: GenerationOptions {
                stop_tokens,
                temperature: None,
                max_tokens: None,
            },
        }
    }

    #[test]
    fn test_clean_strips_fenced_block() {
        assert_eq!(clean_markdown_artifacts("```ts\nconst x=1\n```"), "const x=1");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean_markdown_artifacts("```rust\nfn f() {}\n```");
        let twice = clean_markdown_artifacts(&once);
        assert_eq!(once, twice);
        assert_eq!(clean_markdown_artifacts("already clean"), "already clean");
    }

    #[test]
    fn test_clean_handles_partial_opening_fence() {
        // mid-stream the fence line may not be complete yet
        assert_eq!(clean_markdown_artifacts("```"), "");
        assert_eq!(clean_markdown_artifacts("```ts"), "");
    }

    #[test]
    fn test_clean_preserves_indentation() {
        assert_eq!(
            clean_markdown_artifacts("    indented()\n"),
            "    indented()"
        );
    }

    #[test]
    fn test_truncate_at_earliest_stop_token() {
        let stops = vec!["<|end|>".to_string(), "STOP".to_string()];
        let (text, hit) = truncate_at_stop_token("abcSTOPdef<|end|>", &stops);
        assert_eq!(text, "abc");
        assert!(hit);
    }

    #[test]
    fn test_truncate_without_stop_token() {
        let (text, hit) = truncate_at_stop_token("abc", &["STOP".to_string()]);
        assert_eq!(text, "abc");
        assert!(!hit);
    }

    #[tokio::test]
    async fn test_generate_streams_and_finishes() {
        let client = Arc::new(ReplayClient::new(vec![
            "let a".to_string(),
            " = 1;\n".to_string(),
            "let b = 2;".to_string(),
        ]));
        let generator = CompletionGenerator::new(client);
        let session = CompletionSession::default();
        let id = session.begin_request();

        let text = generator
            .generate(id, "replay", &prompt_result(Vec::new()), &session, true)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(text, "let a = 1;\nlet b = 2;");
        let preview = session.preview();
        assert_eq!(preview.first_line, "let a = 1;");
        assert_eq!(preview.remaining_lines, "let b = 2;");
    }

    #[tokio::test]
    async fn test_generate_respects_stop_tokens() {
        let client = Arc::new(ReplayClient::new(vec![
            "value<|endoftext|>".to_string(),
            "garbage".to_string(),
        ]));
        let generator = CompletionGenerator::new(client);
        let session = CompletionSession::default();
        let id = session.begin_request();

        let text = generator
            .generate(
                id,
                "replay",
                &prompt_result(vec!["<|endoftext|>".to_string()]),
                &session,
                false,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "value");
    }

    #[tokio::test]
    async fn test_superseded_request_returns_none() {
        let client = Arc::new(ReplayClient::new(vec!["foo".to_string(), "bar".to_string()]));
        let generator = CompletionGenerator::new(client);
        let session = CompletionSession::default();
        let id = session.begin_request();
        // another request supersedes before generation starts
        let _newer = session.begin_request();

        let result = generator
            .generate(id, "replay", &prompt_result(Vec::new()), &session, false)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(session.preview(), CompletionPreview::default());
    }

    #[tokio::test]
    async fn test_non_streaming_client_single_shot() {
        let client = Arc::new(
            ReplayClient::new(vec!["whole response".to_string()]).without_streaming(),
        );
        let generator = CompletionGenerator::new(client);
        let session = CompletionSession::default();
        let id = session.begin_request();

        let text = generator
            .generate(id, "replay", &prompt_result(Vec::new()), &session, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "whole response");
    }

    #[tokio::test]
    async fn test_fenced_streamed_response_is_cleaned() {
        let client = Arc::new(ReplayClient::new(vec![
            "```rust\n".to_string(),
            "let x = 1;\n".to_string(),
            "```".to_string(),
        ]));
        let generator = CompletionGenerator::new(client);
        let session = CompletionSession::default();
        let id = session.begin_request();

        let text = generator
            .generate(id, "replay", &prompt_result(Vec::new()), &session, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "let x = 1;");
    }
}
