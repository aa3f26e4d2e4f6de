//! `Surface`: the public per-editor-view handle. Wires C1 (an
//! [`EditMonitor`] subscription filtered to one document) into C2 (a
//! spawned [`TriggerGate`]), and drains C2's launch/result channels into
//! C7's [`GhostTextMachine`], exposing the handful of calls a host's own
//! edit/render/key loop makes: forward an edit in, poll for async
//! outcomes, forward a keypress or cursor move in, accept or reject.
//!
//! One `Surface` per open editor view, matching `TriggerGate`'s own "one
//! gate per surface" design. A host with several open documents builds
//! one `Surface` per document, each over its own launch/result channel
//! pair, typically sharing one [`crate::CoreContext`]'s worker pool and
//! prompt builder through whatever [`Pipeline`] was built for it.
//!
//! [`EditMonitor`]: quill_doc::EditMonitor

use std::sync::{Arc, Mutex};
use std::time::Instant;

use arc_swap::ArcSwap;
use quill_client::{CompletionResult, RequestId};
use quill_doc::{Document, DocumentId, Revision, TriggerEvent, TriggerKind};
use quill_ghost::{accept_into_document, GhostTextMachine, GhostTextState, Key, Outcome, RenderSurface};
use quill_trigger::{GateEvent, LaunchConfig, Pipeline, TriggerConfig, TriggerGate};
use tokio::sync::{broadcast, mpsc};

/// Delay between an acceptance and the chained follow-up trigger, per spec
/// §4.8 step 4 ("schedule a fresh trigger after a short delay ~500ms").
const AUTO_CHAIN_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

pub struct Surface {
    document_id: DocumentId,
    config: Arc<ArcSwap<TriggerConfig>>,
    trigger_tx: mpsc::Sender<GateEvent>,
    launches_rx: mpsc::Receiver<RequestId>,
    results_rx: mpsc::Receiver<CompletionResult>,
    ghost: GhostTextMachine,
    /// Set by [`Surface::text_changed`] when the ghost-text machine clears
    /// an overlay with a grace extension (an edit landed inside the
    /// overlay's own anchor range, spec §4.7's "TextChange inside anchor
    /// range" row); the edit-forwarding task checks this before relaying
    /// the next buffer edit to the trigger gate, so a re-trigger doesn't
    /// fire immediately on the same spot the overlay was just clearing.
    suppress_until: Arc<Mutex<Option<Instant>>>,
}

impl Surface {
    /// Spawns the trigger gate's background task plus a small forwarding
    /// task that filters `edit_events` down to `document_id` - an
    /// `EditMonitor` broadcasts across every open document, but one
    /// `TriggerGate` only ever evaluates one. `results_rx`/`launches_rx`
    /// must be the receiving ends of whatever `Sender`s `pipeline` was
    /// built with (see `CoreContext::build_pipeline`).
    pub fn new(
        document_id: DocumentId,
        config: Arc<ArcSwap<TriggerConfig>>,
        launch_config: Arc<ArcSwap<LaunchConfig>>,
        pipeline: Arc<Pipeline>,
        mut edit_events: broadcast::Receiver<TriggerEvent>,
        launches_rx: mpsc::Receiver<RequestId>,
        results_rx: mpsc::Receiver<CompletionResult>,
    ) -> Self {
        let gate = TriggerGate::new(Arc::clone(&config), launch_config, pipeline);
        let trigger_tx = gate.spawn();

        let suppress_until: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
        let forward_tx = trigger_tx.clone();
        let forward_suppress = Arc::clone(&suppress_until);
        tokio::spawn(async move {
            loop {
                match edit_events.recv().await {
                    Ok(event) if event.document_id == document_id => {
                        let suppressed = matches!(*forward_suppress.lock().unwrap(), Some(until) if Instant::now() < until);
                        if suppressed {
                            continue;
                        }
                        if forward_tx.send(event.into()).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { document_id, config, trigger_tx, launches_rx, results_rx, ghost: GhostTextMachine::new(), suppress_until }
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn state(&self) -> &GhostTextState {
        self.ghost.state()
    }

    /// Sends an explicit (keyboard-shortcut-driven) trigger, bypassing
    /// debounce and the `AutoAI`/`ManualAI`/`Disabled` distinction the
    /// gate applies to observed edits - a `Manual` kind always launches
    /// unless completion is disabled outright (see `quill_trigger::gate`).
    pub fn trigger_manual(&self, revision: Revision, cursor_pos: usize) {
        let event = TriggerEvent { document_id: self.document_id, revision, cursor_pos, kind: TriggerKind::Manual, timestamp: Instant::now() };
        let _ = self.trigger_tx.try_send(event.into());
    }

    /// Drains whatever launches and results have arrived since the last
    /// call and feeds them through the ghost-text machine in launch
    /// order, so a `Requesting` transition is always observed before the
    /// `Result` it seeds. Never blocks; a host calls this from its own
    /// idle or redraw tick.
    pub fn poll(&mut self, buffer_before_cursor: &str, cursor_pos: usize, surface: &dyn RenderSurface, now: Instant) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Ok(request_id) = self.launches_rx.try_recv() {
            outcomes.push(self.ghost.start_request(request_id));
        }
        while let Ok(result) = self.results_rx.try_recv() {
            outcomes.push(self.ghost.receive_result(result, buffer_before_cursor, cursor_pos, surface, now));
        }
        outcomes
    }

    pub fn cursor_moved(&mut self, new_cursor_pos: usize) -> Outcome {
        self.ghost.cursor_moved(new_cursor_pos)
    }

    pub fn text_changed(&mut self, change_start: usize, change_end: usize, now: Instant) -> Outcome {
        let outcome = self.ghost.text_changed(change_start, change_end, now);
        if let Outcome::ClearOverlay { grace_extension: Some(extension) } = outcome {
            *self.suppress_until.lock().unwrap() = Some(now + extension);
        }
        outcome
    }

    pub fn key(&mut self, key: Key, cursor_pos: usize, now: Instant) -> Outcome {
        self.ghost.key(key, cursor_pos, now)
    }

    pub fn reject(&mut self) -> Outcome {
        self.ghost.reject()
    }

    pub fn check_auto_hide(&mut self, now: Instant) -> Outcome {
        self.ghost.check_auto_hide(now)
    }

    /// Accepts the currently displayed suggestion into `document` and
    /// notifies this surface's trigger gate to stand down whatever else
    /// is in flight (spec's "accept notifies the trigger gate to cancel
    /// any other in-flight request on this surface") - the document has
    /// already moved past the revision that request was launched
    /// against, so this only saves the worker-pool permit rather than
    /// waiting for the request's own staleness check to discover it.
    /// Returns whatever [`GhostTextMachine::accept`] returned; callers
    /// only need to act on `Outcome::Accept` if they want a copy of what
    /// was inserted, since `document` has already been mutated.
    pub fn accept(&mut self, document: &mut Document, cursor_pos: usize, now: Instant) -> Outcome {
        let outcome = self.ghost.accept(cursor_pos);
        if let Outcome::Accept { ref suffix, at } = outcome {
            let accepted = accept_into_document(document, suffix, at, None, now);
            let _ = self.trigger_tx.try_send(GateEvent::CancelInFlight);
            self.ghost.acknowledge();
            self.schedule_chain(accepted.revision_after, accepted.cursor_after);
        }
        outcome
    }

    /// Spec §4.8 step 4: if `auto_chain` is set and the surface is in
    /// `AutoAI` mode, a fresh trigger is scheduled ~500ms after acceptance
    /// so the next completion sees the updated buffer. Sent as a
    /// `TextChange` so it still passes through the gate's ordinary
    /// debounce/heuristic/throttle policy rather than bypassing it the way
    /// `Manual` does.
    fn schedule_chain(&self, revision: Revision, cursor_pos: usize) {
        let config = self.config.load();
        if !config.auto_chain || config.mode != quill_trigger::CompletionMode::AutoAI {
            return;
        }
        let document_id = self.document_id;
        let trigger_tx = self.trigger_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(AUTO_CHAIN_DELAY).await;
            let event = TriggerEvent { document_id, revision, cursor_pos, kind: TriggerKind::TextChange, timestamp: Instant::now() };
            let _ = trigger_tx.send(event.into()).await;
        });
    }
}
