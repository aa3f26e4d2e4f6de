//! End-to-end tests that drive a [`Surface`] the way a host editor would:
//! push a text-change trigger in, wait out the debounce window, and read
//! back the ghost-text outcome - against a real socket standing in for
//! the completion provider rather than a stubbed client. No mock-HTTP
//! crate appears anywhere in the retrieved corpus, so the provider is a
//! minimal hand-rolled `TcpListener` responder.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use quill::{
    CompletionMode, Document, DocumentId, DocumentSnapshot, DocumentSource, GhostTextState, LaunchConfig, Outcome, Pipeline, RenderSurface,
    Revision, Surface, TriggerConfig, TriggerEvent, TriggerKind,
};
use quill_client::{ClientConfig, CompletionClient};
use quill_prompt::{PromptBuilder, TemplateRegistry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

struct FixedWidthSurface;
impl RenderSurface for FixedWidthSurface {
    fn advance_width(&self, text: &str) -> f32 {
        text.chars().count() as f32
    }
    fn line_height(&self) -> f32 {
        1.0
    }
    fn available_width(&self) -> f32 {
        1_000.0
    }
}

struct OneDocument(Mutex<quill_doc::Rope>);
impl DocumentSource for OneDocument {
    fn snapshot(&self, document_id: DocumentId) -> Option<DocumentSnapshot> {
        let rope = self.0.lock().unwrap();
        Some(DocumentSnapshot { document_id, revision: Revision::zero(), cursor: rope.len_chars(), text: rope.clone() })
    }
}

async fn serve_once(listener: TcpListener, body: String) {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut buf = [0u8; 8192];
    let _ = socket.read(&mut buf).await.unwrap();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body,
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.ok();
}

#[tokio::test]
async fn a_text_change_trigger_debounces_then_shows_the_providers_suggestion() {
    // Spec scenario: buffer "Alice opened the door and " (cursor at 27),
    // AutoAI mode, short debounce. A stub provider answers "stepped into
    // the garden." and the overlay displays exactly that suffix.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = r#"{"choices":[{"message":{"content":"stepped into the garden."}}]}"#.to_string();
    tokio::spawn(serve_once(listener, body));

    let doc_id = DocumentId::from_raw(1);
    let buffer = "Alice opened the door and ";
    let cursor = buffer.chars().count();

    let (results_tx, results_rx) = mpsc::channel(4);
    let (launches_tx, launches_rx) = mpsc::channel(4);
    let registry = TemplateRegistry::builtin_only().unwrap();
    let pipeline = Arc::new(Pipeline {
        documents: Arc::new(OneDocument(Mutex::new(quill_doc::Rope::from_str(buffer)))),
        retrieval: None,
        fallback: None,
        prompt_builder: Arc::new(PromptBuilder::new(registry)),
        client: Arc::new(CompletionClient::new(
            reqwest::Client::new(),
            ClientConfig { endpoint: format!("http://{addr}/v1/chat/completions"), api_key: None, model: "test-model".into() },
        )),
        results: results_tx,
        worker_permits: Arc::new(tokio::sync::Semaphore::new(4)),
        launches: launches_tx,
    });

    let trigger_config = Arc::new(ArcSwap::from_pointee(TriggerConfig {
        mode: CompletionMode::AutoAI,
        debounce_ms: 30,
        min_chars: 0,
        ..TriggerConfig::default()
    }));
    let launch_config = Arc::new(ArcSwap::from_pointee(LaunchConfig { rag_enabled: false, provider_timeout_ms: 2_000, ..LaunchConfig::default() }));
    let (monitor_tx, edit_rx) = broadcast::channel(16);

    let mut surface = Surface::new(doc_id, trigger_config, launch_config, pipeline, edit_rx, launches_rx, results_rx);

    monitor_tx
        .send(TriggerEvent { document_id: doc_id, revision: Revision::zero(), cursor_pos: cursor, kind: TriggerKind::TextChange, timestamp: Instant::now() })
        .unwrap();

    let mut saw_thinking = false;
    let mut saw_overlay = false;
    for _ in 0..100 {
        for outcome in surface.poll(buffer, cursor, &FixedWidthSurface, Instant::now()) {
            match outcome {
                Outcome::ShowThinking => saw_thinking = true,
                Outcome::RenderOverlay => saw_overlay = true,
                _ => {}
            }
        }
        if saw_overlay {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(saw_thinking, "expected a ShowThinking outcome once the debounced trigger launched");
    assert!(saw_overlay, "expected a RenderOverlay outcome once the provider's result arrived");
    match surface.state() {
        GhostTextState::Displayed(overlay) => assert_eq!(overlay.suffix, "stepped into the garden."),
        other => panic!("expected Displayed, got {other:?}"),
    }

    let mut document = Document::new(doc_id, buffer);
    let outcome = surface.accept(&mut document, cursor, Instant::now());
    assert!(matches!(outcome, Outcome::Accept { .. }));
    assert_eq!(document.text().to_string(), "Alice opened the door and stepped into the garden.");
}
