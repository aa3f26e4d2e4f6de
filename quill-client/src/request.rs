use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic request identifier, the sole tie-breaker when multiple
/// [`crate::CompletionResult`]s race to arrive. Allocated by
/// whatever orchestrates launches (`quill-trigger`), never by the client
/// itself, so a single counter is shared across every surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn from_raw(id: u64) -> Self {
        RequestId(id)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Generates the next id in process-wide monotonic order.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RequestId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Everything the completion client needs to perform one model call.
/// Deliberately narrower than the document-level completion request -
/// the document-level bookkeeping (`document_id`, `revision_at_launch`,
/// `text_window`, ...) lives one layer up in `quill-trigger`, which
/// composes this with that bookkeeping before launch. This crate only
/// ever sees what it needs to make and tag an HTTP call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub request_id: RequestId,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
    /// Overrides the client's configured model for this call only.
    pub model: Option<String>,
    pub deadline: Instant,
    /// True when a retry can never change the model's answer (deterministic
    /// sampling, or an explicit idempotency key was supplied upstream) -
    /// the only case in which the retry policy is allowed to resend.
    pub idempotent: bool,
}
