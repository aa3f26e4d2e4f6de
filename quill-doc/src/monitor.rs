use std::collections::HashSet;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::document::{DocumentId, Revision};
use crate::trigger::{TriggerEvent, TriggerKind};

/// Translates host notifications about buffer mutations and cursor moves
/// into [`TriggerEvent`]s, broadcast to every interested component (the
/// Trigger Gate and the Ghost-Text state machine both subscribe
/// independently rather than the monitor routing to one fixed consumer).
///
/// Every method here is synchronous, allocation-free on the hot path, and
/// does no I/O - it must be safe to call from whatever thread owns the
/// host's text widget.
pub struct EditMonitor {
    tx: broadcast::Sender<TriggerEvent>,
    known: HashSet<DocumentId>,
    current: Option<DocumentId>,
}

impl EditMonitor {
    /// `capacity` bounds how many events a lagging subscriber may fall
    /// behind by before it starts missing events (reported to that
    /// subscriber as `RecvError::Lagged`, never a panic or a block).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            known: HashSet::new(),
            current: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TriggerEvent> {
        self.tx.subscribe()
    }

    pub fn register_document(&mut self, id: DocumentId) {
        self.known.insert(id);
    }

    pub fn remove_document(&mut self, id: DocumentId) {
        self.known.remove(&id);
        if self.current == Some(id) {
            self.current = None;
        }
    }

    /// Switches which document is "current" (focused). Emits no trigger.
    pub fn set_current_document(&mut self, id: Option<DocumentId>) {
        self.current = id;
    }

    pub fn current_document(&self) -> Option<DocumentId> {
        self.current
    }

    /// Reports a text mutation. Fails silently if `document_id` is
    /// unknown (never registered, or since removed).
    pub fn on_text_changed(&self, document_id: DocumentId, new_revision: Revision, cursor_pos: usize) {
        self.emit(document_id, new_revision, cursor_pos, TriggerKind::TextChange);
    }

    /// Reports a cursor move with no accompanying text change. Never
    /// causes a completion to be launched directly - only the Trigger
    /// Gate's heuristics decide that, and they ignore `CursorMove` kinds
    /// for launch purposes (see `quill-trigger`).
    pub fn on_cursor_moved(&self, document_id: DocumentId, new_revision: Revision, cursor_pos: usize) {
        self.emit(document_id, new_revision, cursor_pos, TriggerKind::CursorMove);
    }

    fn emit(&self, document_id: DocumentId, revision: Revision, cursor_pos: usize, kind: TriggerKind) {
        if !self.known.contains(&document_id) {
            return;
        }
        // No subscribers is a legitimate state (core constructed but not
        // yet wired up); `send` returning an error just means the event
        // was observed by nobody, which is fine to drop.
        let _ = self.tx.send(TriggerEvent {
            document_id,
            revision,
            cursor_pos,
            kind,
            timestamp: Instant::now(),
        });
    }
}
