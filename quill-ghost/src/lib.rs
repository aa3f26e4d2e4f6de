//! Ghost-text state machine and acceptance coordinator (components C7 and
//! C8 of the completion core). Given a formatted, diffed suggestion this
//! crate tracks what is currently shown to the user, reacts to cursor
//! movement, text edits and keypresses, wraps the overlay against the
//! host's rendering surface, and - on accept - writes the suggestion into
//! the document and tells the rest of the pipeline to stand down.

mod anchor;
mod coordinator;
mod diff;
mod format;
mod state;

pub use anchor::{wrap_to_surface, RenderSurface};
pub use coordinator::{accept_into_document, CompletionAccepted};
pub use diff::incremental_diff;
pub use format::format_suggestion;
pub use state::{DisplayedOverlay, GhostTextMachine, GhostTextState, Key, Outcome};
