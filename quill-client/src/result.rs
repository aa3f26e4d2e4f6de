use crate::error::ClientErrorKind;
use crate::request::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Outcome of one completion call, always tagged with the `request_id` it
/// answers so the caller can discard it if it no longer matches the
/// in-flight slot.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionStatus {
    Ok,
    Cancelled,
    Timeout,
    Error(ClientErrorKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub request_id: RequestId,
    pub status: CompletionStatus,
    pub text: Option<String>,
    pub usage: Option<Usage>,
}

impl CompletionResult {
    pub fn ok(request_id: RequestId, text: String, usage: Option<Usage>) -> Self {
        Self { request_id, status: CompletionStatus::Ok, text: Some(text), usage }
    }

    pub fn cancelled(request_id: RequestId) -> Self {
        Self { request_id, status: CompletionStatus::Cancelled, text: None, usage: None }
    }

    pub fn timeout(request_id: RequestId) -> Self {
        Self { request_id, status: CompletionStatus::Timeout, text: None, usage: None }
    }

    pub fn error(request_id: RequestId, kind: ClientErrorKind) -> Self {
        Self { request_id, status: CompletionStatus::Error(kind), text: None, usage: None }
    }
}
