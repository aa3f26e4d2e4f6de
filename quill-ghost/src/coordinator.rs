use std::time::Instant;

use quill_doc::{Document, DocumentId, Revision};
use quill_event::CancelTx;

/// Emitted once a suggestion is actually written into the document, for
/// whatever the host wires up as telemetry (acceptance rate, latency
/// histograms, ...). Carries enough to join back against the request that
/// produced the suggestion.
#[derive(Debug, Clone)]
pub struct CompletionAccepted {
    pub document_id: DocumentId,
    pub revision_after: Revision,
    pub inserted_chars: usize,
    pub cursor_after: usize,
    pub at: Instant,
}

/// Applies an accepted suggestion to its document and tells whatever else
/// was racing against it to stand down. This is the only place outside
/// `Document::insert` itself that mutates a document on the core's behalf.
///
/// `rest_of_pipeline` is the cancellation handle for any other in-flight
/// work tied to this document's current revision (a sibling surface's
/// request, a still-running retrieval call, ...); accepting a suggestion
/// invalidates all of it, since the document is about to move past the
/// revision they were launched against. Sending on an already-dropped
/// receiver is a no-op, not an error.
pub fn accept_into_document(
    document: &mut Document,
    suffix: &str,
    at: usize,
    rest_of_pipeline: Option<CancelTx>,
    now: Instant,
) -> CompletionAccepted {
    let cursor_after = document.insert(at, suffix);
    if let Some(cancel) = rest_of_pipeline {
        let _ = cancel.send(());
    }
    CompletionAccepted {
        document_id: document.id(),
        revision_after: document.revision(),
        inserted_chars: suffix.chars().count(),
        cursor_after,
        at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepting_inserts_and_bumps_revision() {
        let mut doc = Document::new(DocumentId::from_raw(1), "Alice opened the door and ");
        let before = doc.revision();
        let event = accept_into_document(&mut doc, "stepped into the garden.", 27, None, Instant::now());
        assert!(doc.revision() > before);
        assert_eq!(event.inserted_chars, "stepped into the garden.".chars().count());
        assert_eq!(
            doc.text().to_string(),
            "Alice opened the door and stepped into the garden."
        );
        assert_eq!(event.cursor_after, doc.cursor());
    }

    #[test]
    fn accepting_cancels_the_rest_of_the_pipeline() {
        let (tx, mut rx) = quill_event::cancelation();
        let mut doc = Document::new(DocumentId::from_raw(1), "hi ");
        accept_into_document(&mut doc, "there", 3, Some(tx), Instant::now());
        assert!(rx.try_recv().is_ok());
    }
}
