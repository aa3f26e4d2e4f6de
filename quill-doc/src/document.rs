use std::sync::atomic::{AtomicU64, Ordering};

use ropey::Rope;

/// Stable identifier for a document, assigned once by whatever system
/// creates the document (a project, a file open event, ...) and never
/// reused. The core never allocates these itself except in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub const fn from_raw(id: u64) -> Self {
        DocumentId(id)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Convenience generator for hosts and tests that don't already have a
    /// stable id scheme of their own.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DocumentId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Monotonic per-document mutation counter. A `Revision` is only ever
/// compared for equality against the revision recorded at request-launch
/// time; it carries no other meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Revision(u64);

impl Revision {
    pub const fn zero() -> Self {
        Revision(0)
    }

    fn bump(self) -> Self {
        Revision(self.0 + 1)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A document as the completion core sees it: a Rope of Unicode scalars,
/// a cursor (a char offset into that rope, not a byte offset), a stable
/// id, and a revision that increments on every mutation.
///
/// Documents are created by the host application and hand-over ownership
/// of edits to the core through [`crate::EditMonitor`] and
/// [`Document::apply_insert`]; the core never reads from or writes to disk.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    text: Rope,
    cursor: usize,
    revision: Revision,
}

impl Document {
    pub fn new(id: DocumentId, text: impl Into<Rope>) -> Self {
        let text = text.into();
        let cursor = text.len_chars();
        Self {
            id,
            text,
            cursor,
            revision: Revision::zero(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    /// Cursor position as a char offset into [`Document::text`].
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Moves the cursor without touching the text or the revision. Used by
    /// the host to report `CursorMove` trigger events.
    pub fn move_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.text.len_chars());
    }

    /// Replaces the text wholesale and bumps the revision, used by the host
    /// for edits originating outside an accepted completion (typing,
    /// pasting, undo, ...). `new_cursor` is the cursor position after the
    /// edit, as reported by the host's editor widget.
    pub fn apply_edit(&mut self, text: Rope, new_cursor: usize) {
        self.text = text;
        self.cursor = new_cursor.min(self.text.len_chars());
        self.revision = self.revision.bump();
    }

    /// Inserts `suffix` at `at` (a char offset) and bumps the revision.
    /// This is the only mutation the core performs on a document directly:
    /// it is how the Acceptance Coordinator (C8) applies an accepted
    /// suggestion. Returns the cursor position immediately after the
    /// inserted text.
    pub fn insert(&mut self, at: usize, suffix: &str) -> usize {
        let at = at.min(self.text.len_chars());
        self.text.insert(at, suffix);
        self.revision = self.revision.bump();
        let new_cursor = at + suffix.chars().count();
        self.cursor = new_cursor;
        new_cursor
    }
}
