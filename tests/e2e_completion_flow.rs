/// End-to-end tests across the workspace crates
///
/// Settings come from a YAML document, the model client is the replay
/// client, and the editor is simulated by driving the façade the way a
/// host would: trigger, accept, report the insertion, re-trigger.
use std::sync::Arc;

use ghostwriter_completion::{
    Acceptance, CompletionEvent, CompletionEventSink, CompletionQuery, InlineCompletionProvider,
    Position, TriggerKind, UiSurface,
};
use ghostwriter_config::{ConfigFormat, SettingsLoader};
use ghostwriter_providers::ReplayClient;

fn query(text: &str, line: u32, character: u32) -> CompletionQuery {
    CompletionQuery {
        uri: "file:///workspace/src/main.rs".to_string(),
        text: text.to_string(),
        language_id: "rust".to_string(),
        position: Position::new(line, character),
        trigger: TriggerKind::Invoke,
        typed_prefix: None,
    }
}

#[tokio::test]
async fn test_yaml_settings_drive_two_stage_flow() {
    let yaml = "\
debounce_delay_ms: 5
multiline: two-stage
model: qwen2.5-coder-7b
";
    let settings = SettingsLoader::load_from_string(yaml, ConfigFormat::Yaml).unwrap();
    let client = Arc::new(ReplayClient::from_text("let a = 1;\nlet b = 2;", 4));
    let provider = InlineCompletionProvider::new(settings, client).with_reponame("demo");

    let item = provider
        .provide_completion(&query("fn main() {\n}", 0, 11))
        .await
        .unwrap();
    assert_eq!(item.insert_text, "let a = 1;");

    let first = provider.accept().unwrap();
    assert_eq!(first, Acceptance::FirstLine("let a = 1;".to_string()));

    provider.handle_document_change("file:///workspace/src/main.rs", Some("let a = 1;"));
    provider.handle_selection_change();

    let item = provider
        .provide_completion(&query("fn main() {let a = 1;\n}", 0, 21))
        .await
        .unwrap();
    assert_eq!(item.insert_text, "let b = 2;");

    let second = provider.accept().unwrap();
    assert_eq!(second, Acceptance::Remainder("let b = 2;".to_string()));
}

#[tokio::test]
async fn test_markdown_fenced_model_output_is_stripped() {
    let yaml = "debounce_delay_ms: 5\nmodel: gemini-1.5-flash\n";
    let settings = SettingsLoader::load_from_string(yaml, ConfigFormat::Yaml).unwrap();
    let client = Arc::new(ReplayClient::new(vec![
        "```rust\n".to_string(),
        "let x = compute();".to_string(),
        "\n```".to_string(),
    ]));
    let provider = InlineCompletionProvider::new(settings, client);

    let item = provider
        .provide_completion(&query("fn main() {\n}", 0, 11))
        .await
        .unwrap();
    assert_eq!(item.insert_text, "let x = compute();");
}

#[tokio::test]
async fn test_dismissal_clears_preview_and_acceptance() {
    let yaml = "debounce_delay_ms: 5\n";
    let settings = SettingsLoader::load_from_string(yaml, ConfigFormat::Yaml).unwrap();
    let client = Arc::new(ReplayClient::from_text("suggestion", 4));
    let provider = InlineCompletionProvider::new(settings, client);

    provider
        .provide_completion(&query("fn main() {}", 0, 11))
        .await
        .unwrap();
    provider.dismiss();
    assert!(provider.accept().is_none());
}

#[tokio::test]
async fn test_lifecycle_events_reach_the_editor() {
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<&'static str>>,
        indicator_shown: Mutex<bool>,
    }

    impl CompletionEventSink for Recorder {
        fn on_event(&self, event: CompletionEvent) {
            let label = match event {
                CompletionEvent::Started { .. } => "started",
                CompletionEvent::FirstLineReady { .. } => "first-line",
                CompletionEvent::PreviewUpdated { .. } => "updated",
                CompletionEvent::Finished { .. } => "finished",
                CompletionEvent::Cancelled { .. } => "cancelled",
                CompletionEvent::Failed { .. } => "failed",
            };
            self.events.lock().unwrap().push(label);
        }
    }

    impl UiSurface for Recorder {
        fn show_indicator(&self) {
            *self.indicator_shown.lock().unwrap() = true;
        }
        fn hide_indicator(&self) {
            *self.indicator_shown.lock().unwrap() = false;
        }
        fn request_redraw(&self) {}
    }

    let recorder = Arc::new(Recorder::default());
    let yaml = "debounce_delay_ms: 5\n";
    let settings = SettingsLoader::load_from_string(yaml, ConfigFormat::Yaml).unwrap();
    let client = Arc::new(ReplayClient::from_text("line one\nline two", 4));
    let provider = InlineCompletionProvider::new(settings, client)
        .with_observers(recorder.clone(), recorder.clone());

    provider
        .provide_completion(&query("fn main() {\n}", 0, 11))
        .await
        .unwrap();

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.first(), Some(&"started"));
    assert_eq!(events.last(), Some(&"finished"));
    assert!(events.contains(&"first-line"));
    // the indicator is hidden again once the stream finishes
    assert!(!*recorder.indicator_shown.lock().unwrap());
}

#[tokio::test]
async fn test_stale_trigger_after_edit_regenerates() {
    let yaml = "debounce_delay_ms: 5\n";
    let settings = SettingsLoader::load_from_string(yaml, ConfigFormat::Yaml).unwrap();
    let client = Arc::new(ReplayClient::from_text("first completion", 8));
    let provider = InlineCompletionProvider::new(settings, client);

    let before = provider
        .provide_completion(&query("fn main() {}", 0, 11))
        .await
        .unwrap();

    // an unrelated edit cancels and invalidates
    provider.handle_document_change("file:///workspace/src/main.rs", Some("x"));

    let after = provider
        .provide_completion(&query("fn main() {x}", 0, 12))
        .await
        .unwrap();
    assert_eq!(before.insert_text, after.insert_text);
    assert!(before.request_id < after.request_id);
}
