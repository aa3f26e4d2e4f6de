//! Document model and edit-monitoring (component C1 of the completion
//! core). This crate owns the only mutable state the core ever writes to
//! directly: a document's text and cursor. Everything downstream works
//! from `Rope` snapshots and revision numbers, never a live reference.

mod document;
mod monitor;
mod trigger;

pub use document::{Document, DocumentId, Revision};
pub use monitor::EditMonitor;
pub use trigger::{TriggerEvent, TriggerKind};

pub use ropey::Rope;
