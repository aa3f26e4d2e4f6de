use std::sync::Arc;

use arc_swap::ArcSwap;
use quill_client::RequestId;
use quill_doc::{DocumentId, Revision, Rope, TriggerEvent, TriggerKind};
use quill_event::{send_blocking, AsyncHook, CancelTx};
use tokio::time::Instant;

use crate::config::{CompletionMode, TriggerConfig};
use crate::fingerprint::content_fingerprint;
use crate::heuristic::{classify, Heuristic};
use crate::launch::{run_pipeline, LaunchConfig, Pipeline};

#[derive(Debug, Clone, Copy)]
struct PendingTrigger {
    document_id: DocumentId,
    revision: Revision,
    cursor_pos: usize,
    kind: TriggerKind,
}

/// What a [`TriggerGate`] consumes: either a buffer/cursor observation
/// from C1, or an explicit request to stand down the in-flight slot
/// without waiting for a new trigger to supersede it. The latter is how
/// the Acceptance Coordinator's "notify C2 to cancel any other in-flight
/// request on this surface" (spec §4.8 step 3) reaches the gate - an
/// accepted suggestion already moved the document to a new revision, so
/// whatever was in flight is about to be discarded by its own
/// revision/id check anyway, but there is no reason to let it keep
/// running against a worker-pool permit.
#[derive(Debug, Clone, Copy)]
pub enum GateEvent {
    Trigger(TriggerEvent),
    CancelInFlight,
}

impl From<TriggerEvent> for GateEvent {
    fn from(event: TriggerEvent) -> Self {
        GateEvent::Trigger(event)
    }
}

/// Decides whether a [`TriggerEvent`] becomes a completion request
/// (component C2), under debounce, throttle and content heuristics, and
/// owns the single in-flight slot per editor surface. One `TriggerGate`
/// corresponds to one surface; a host with multiple open editors runs one
/// per surface.
pub struct TriggerGate {
    config: Arc<ArcSwap<TriggerConfig>>,
    launch_config: Arc<ArcSwap<LaunchConfig>>,
    pipeline: Arc<Pipeline>,
    trigger: Option<PendingTrigger>,
    /// Cancellation handle for the currently in-flight request, if any.
    /// Taking and sending on this is the entire cancellation mechanism -
    /// there is no separate "abort" call.
    request: Option<CancelTx>,
    last_launch: Option<Instant>,
    last_fingerprint: Option<u64>,
}

impl TriggerGate {
    pub fn new(config: Arc<ArcSwap<TriggerConfig>>, launch_config: Arc<ArcSwap<LaunchConfig>>, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            launch_config,
            pipeline,
            trigger: None,
            request: None,
            last_launch: None,
            last_fingerprint: None,
        }
    }
}

impl AsyncHook for TriggerGate {
    type Event = GateEvent;

    fn handle_event(&mut self, event: Self::Event, old_timeout: Option<Instant>) -> Option<Instant> {
        let event = match event {
            GateEvent::CancelInFlight => {
                // Leaves any already-pending debounce timer untouched -
                // this only stands down a request that already launched.
                if let Some(previous) = self.request.take() {
                    let _ = previous.send(());
                }
                return old_timeout;
            }
            GateEvent::Trigger(event) => event,
        };

        let config = self.config.load();

        if !config.completion_enabled {
            self.trigger = None;
            self.request = None;
            return None;
        }
        if config.mode == CompletionMode::Disabled && event.kind != TriggerKind::Manual {
            return None;
        }
        if config.mode == CompletionMode::ManualAI && event.kind != TriggerKind::Manual {
            return None;
        }

        let Some(snapshot) = self.pipeline.documents.snapshot(event.document_id) else {
            return None;
        };
        let text_before_cursor = preceding_text(&snapshot.text, event.cursor_pos);

        let fingerprint = content_fingerprint(&text_before_cursor);
        if self.last_fingerprint == Some(fingerprint) {
            return None;
        }

        if non_whitespace_count(&text_before_cursor) < config.min_chars {
            return None;
        }

        if classify(&text_before_cursor, config.punctuation_assist) == Heuristic::MidWord {
            return None;
        }

        self.last_fingerprint = Some(fingerprint);
        self.trigger = Some(PendingTrigger {
            document_id: event.document_id,
            revision: event.revision,
            cursor_pos: event.cursor_pos,
            kind: event.kind,
        });

        if event.kind == TriggerKind::Manual {
            self.finish_debounce();
            return None;
        }

        Some(Instant::now() + config.debounce())
    }

    fn finish_debounce(&mut self) {
        let Some(trigger) = self.trigger.take() else {
            return;
        };
        let config = self.config.load();
        let now = Instant::now();

        if trigger.kind != TriggerKind::Manual {
            if let Some(last_launch) = self.last_launch {
                if now.saturating_duration_since(last_launch) < config.throttle() {
                    return;
                }
            }
        }

        if let Some(previous) = self.request.take() {
            let _ = previous.send(());
        }

        // Backpressure: a saturated worker pool drops the launch outright
        // rather than queuing it. The prior token above is cancelled
        // either way; the user's next trigger is evaluated afresh.
        let Ok(permit) = Arc::clone(&self.pipeline.worker_permits).try_acquire_owned() else {
            log::warn!("worker pool saturated, dropping completion request for document {:?}", trigger.document_id);
            return;
        };

        let request_id = RequestId::next();
        let (cancel_tx, cancel_rx) = quill_event::cancelation();
        self.request = Some(cancel_tx);
        self.last_launch = Some(now);
        send_blocking(&self.pipeline.launches, request_id);

        let pipeline = Arc::clone(&self.pipeline);
        let launch_config = (**self.launch_config.load()).clone();
        let prompt_mode = config.prompt_mode;

        tokio::spawn(async move {
            run_pipeline(
                pipeline,
                request_id,
                trigger.document_id,
                trigger.revision,
                prompt_mode,
                launch_config,
                cancel_rx,
            )
            .await;
            drop(permit);
        });
    }
}

/// Up to 2000 trailing chars before `cursor`, matching the context
/// extractor's own lookback so the two stay in agreement about what
/// "immediately before the cursor" means.
fn preceding_text(text: &Rope, cursor: usize) -> String {
    let cursor = cursor.min(text.len_chars());
    let start = cursor.saturating_sub(2_000);
    text.slice(start..cursor).to_string()
}

fn non_whitespace_count(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::{DocumentSnapshot, DocumentSource};
    use quill_client::{ClientConfig, CompletionClient};
    use quill_prompt::{PromptBuilder, TemplateRegistry};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct FixedDocument(Mutex<DocumentSnapshot>);
    impl DocumentSource for FixedDocument {
        fn snapshot(&self, document_id: DocumentId) -> Option<DocumentSnapshot> {
            let guard = self.0.lock().unwrap();
            if guard.document_id != document_id {
                return None;
            }
            Some(DocumentSnapshot {
                document_id: guard.document_id,
                revision: guard.revision,
                cursor: guard.cursor,
                text: guard.text.clone(),
            })
        }
    }

    fn gate_with(text: &str, cursor: usize) -> (TriggerGate, Arc<ArcSwap<TriggerConfig>>, mpsc::Receiver<quill_client::CompletionResult>, Arc<Pipeline>) {
        let (results_tx, results_rx) = mpsc::channel(4);
        let doc = FixedDocument(Mutex::new(DocumentSnapshot {
            document_id: DocumentId::from_raw(1),
            revision: Revision::zero(),
            cursor,
            text: Rope::from_str(text),
        }));
        let registry = TemplateRegistry::builtin_only().unwrap();
        let pipeline = Arc::new(Pipeline {
            documents: Arc::new(doc),
            retrieval: None,
            fallback: None,
            prompt_builder: Arc::new(PromptBuilder::new(registry)),
            client: Arc::new(CompletionClient::new(
                reqwest::Client::new(),
                ClientConfig { endpoint: "http://127.0.0.1:1/v1/chat/completions".into(), api_key: None, model: "test".into() },
            )),
            results: results_tx,
            worker_permits: Arc::new(tokio::sync::Semaphore::new(4)),
            launches: mpsc::channel(4).0,
        });
        let config = Arc::new(ArcSwap::from_pointee(TriggerConfig::default()));
        let launch_config = Arc::new(ArcSwap::from_pointee(LaunchConfig { rag_enabled: false, ..LaunchConfig::default() }));
        (TriggerGate::new(Arc::clone(&config), launch_config, Arc::clone(&pipeline)), config, results_rx, pipeline)
    }

    fn text_change(document_id: DocumentId, cursor_pos: usize) -> GateEvent {
        GateEvent::Trigger(TriggerEvent { document_id, revision: Revision::zero(), cursor_pos, kind: TriggerKind::TextChange, timestamp: std::time::Instant::now() })
    }

    #[test]
    fn disabled_completion_drops_every_event() {
        let (mut gate, config, _rx, _pipeline) = gate_with("She walked into the room.", 26);
        config.store(Arc::new(TriggerConfig { completion_enabled: false, ..TriggerConfig::default() }));
        let outcome = gate.handle_event(text_change(DocumentId::from_raw(1), 26), None);
        assert!(outcome.is_none());
    }

    #[test]
    fn below_min_chars_drops() {
        let (mut gate, config, _rx, _pipeline) = gate_with("Hi", 2);
        config.store(Arc::new(TriggerConfig { min_chars: 10, ..TriggerConfig::default() }));
        let outcome = gate.handle_event(text_change(DocumentId::from_raw(1), 2), None);
        assert!(outcome.is_none());
    }

    #[test]
    fn mid_word_space_drops() {
        let (mut gate, _config, _rx, _pipeline) = gate_with("she walked ", 11);
        let outcome = gate.handle_event(text_change(DocumentId::from_raw(1), 11), None);
        assert!(outcome.is_none());
    }

    #[test]
    fn sentence_terminator_schedules_a_debounce_timeout() {
        let (mut gate, _config, _rx, _pipeline) = gate_with("She walked into the room.", 26);
        let outcome = gate.handle_event(text_change(DocumentId::from_raw(1), 26), None);
        assert!(outcome.is_some());
    }

    #[test]
    fn identical_fingerprint_is_dropped_on_the_second_event() {
        let (mut gate, _config, _rx, _pipeline) = gate_with("She walked into the room.", 26);
        let first = gate.handle_event(text_change(DocumentId::from_raw(1), 26), None);
        assert!(first.is_some());
        let second = gate.handle_event(text_change(DocumentId::from_raw(1), 26), None);
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn manual_trigger_launches_immediately_and_delivers_a_result() {
        let (mut gate, _config, mut rx, _pipeline) = gate_with("She walked into the room.", 26);
        let event = TriggerEvent {
            document_id: DocumentId::from_raw(1),
            revision: Revision::zero(),
            cursor_pos: 26,
            kind: TriggerKind::Manual,
            timestamp: std::time::Instant::now(),
        };
        let outcome = gate.handle_event(event.into(), None);
        assert!(outcome.is_none());
        let result = rx.recv().await.unwrap();
        assert!(result.request_id.raw() > 0);
    }

    #[tokio::test]
    async fn launch_is_reported_before_the_result_arrives() {
        let (results_tx, mut results_rx) = mpsc::channel(4);
        let (launches_tx, mut launches_rx) = mpsc::channel(4);
        let doc = FixedDocument(Mutex::new(DocumentSnapshot {
            document_id: DocumentId::from_raw(1),
            revision: Revision::zero(),
            cursor: 26,
            text: Rope::from_str("She walked into the room."),
        }));
        let registry = TemplateRegistry::builtin_only().unwrap();
        let pipeline = Arc::new(Pipeline {
            documents: Arc::new(doc),
            retrieval: None,
            fallback: None,
            prompt_builder: Arc::new(PromptBuilder::new(registry)),
            client: Arc::new(CompletionClient::new(
                reqwest::Client::new(),
                ClientConfig { endpoint: "http://127.0.0.1:1/v1/chat/completions".into(), api_key: None, model: "test".into() },
            )),
            results: results_tx,
            worker_permits: Arc::new(tokio::sync::Semaphore::new(4)),
            launches: launches_tx,
        });
        let config = Arc::new(ArcSwap::from_pointee(TriggerConfig::default()));
        let launch_config = Arc::new(ArcSwap::from_pointee(LaunchConfig { rag_enabled: false, ..LaunchConfig::default() }));
        let mut gate = TriggerGate::new(Arc::clone(&config), launch_config, pipeline);

        let event = TriggerEvent {
            document_id: DocumentId::from_raw(1),
            revision: Revision::zero(),
            cursor_pos: 26,
            kind: TriggerKind::Manual,
            timestamp: std::time::Instant::now(),
        };
        gate.handle_event(event.into(), None);

        let launched_id = launches_rx.recv().await.unwrap();
        let result = results_rx.recv().await.unwrap();
        assert_eq!(launched_id, result.request_id);
    }

    #[tokio::test]
    async fn saturated_worker_pool_drops_the_launch() {
        let (mut gate, _config, mut rx, pipeline) = gate_with("She walked into the room.", 26);
        let _held = pipeline.worker_permits.acquire_many(4).await.unwrap();
        let event = TriggerEvent {
            document_id: DocumentId::from_raw(1),
            revision: Revision::zero(),
            cursor_pos: 26,
            kind: TriggerKind::Manual,
            timestamp: std::time::Instant::now(),
        };
        let outcome = gate.handle_event(event.into(), None);
        assert!(outcome.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn cancel_in_flight_stands_down_the_request_without_touching_a_pending_timeout() {
        let (mut gate, _config, _rx, _pipeline) = gate_with("She walked into the room.", 26);
        let (cancel_tx, cancel_rx) = quill_event::cancelation();
        gate.request = Some(cancel_tx);
        let deadline = Instant::now();
        let outcome = gate.handle_event(GateEvent::CancelInFlight, Some(deadline));
        assert_eq!(outcome, Some(deadline));
        assert!(gate.request.is_none());
        assert!(cancel_rx.try_recv().is_ok());
    }
}
