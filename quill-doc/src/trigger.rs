use std::time::Instant;

use crate::document::{DocumentId, Revision};

/// What caused a [`TriggerEvent`] to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// The buffer's text changed.
    TextChange,
    /// Only the cursor moved; text is unchanged.
    CursorMove,
    /// The host explicitly asked for a completion (a keybinding, a menu
    /// item, ...). Bypasses debounce and throttle but still honors
    /// `completion_enabled`.
    Manual,
}

/// Emitted by [`crate::EditMonitor`] whenever the host reports a buffer
/// mutation or cursor movement. Consumed by the Trigger Gate.
#[derive(Debug, Clone, Copy)]
pub struct TriggerEvent {
    pub document_id: DocumentId,
    pub revision: Revision,
    pub cursor_pos: usize,
    pub kind: TriggerKind,
    pub timestamp: Instant,
}
