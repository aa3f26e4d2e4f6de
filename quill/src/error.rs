//! The facade's composed error taxonomy (spec §7): `Configuration`,
//! `Network`, `Timeout`, `Provider`, `Protocol`, `Cancelled`, `Stale`.
//! Component crates each define their own narrow `thiserror` enum for the
//! failures they can produce locally (`ClientError`, `RetrievalError`,
//! `PromptError`); this enum is where those get folded into the one
//! vocabulary a host application reacts to.

use quill_client::{ClientError, ClientErrorKind};
use quill_prompt::PromptError;
use quill_retrieval::RetrievalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    /// Missing or invalid settings. Never retried; disables AutoAI until
    /// configuration changes (spec §7).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Transient failure of the embedding or completion endpoints.
    #[error("network error: {0}")]
    Network(String),
    /// A budget or deadline was exceeded. Treated as `Network` for
    /// circuit-breaker purposes but never retried within the same request.
    #[error("request exceeded its deadline")]
    Timeout,
    /// Server-side refusal: auth, quota, model error.
    #[error("provider error: {0}")]
    Provider(String),
    /// Response shape mismatch.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Normal outcome of supersession; never shown to the user.
    #[error("request cancelled")]
    Cancelled,
    /// A result arrived after the document's revision moved past the
    /// request's launch revision; silently discarded by the caller.
    #[error("result is stale")]
    Stale,
}

impl CompletionError {
    /// Whether this error should ever reach the user as a visible
    /// indicator (spec §7: `Stale`/`Cancelled` are invisible, everything
    /// else eventually is).
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, CompletionError::Cancelled | CompletionError::Stale)
    }
}

impl From<ClientError> for CompletionError {
    fn from(err: ClientError) -> Self {
        match err.kind() {
            ClientErrorKind::Network => CompletionError::Network(err.to_string()),
            ClientErrorKind::Provider => CompletionError::Provider(err.to_string()),
            ClientErrorKind::Protocol => CompletionError::Protocol(err.to_string()),
        }
    }
}

impl From<RetrievalError> for CompletionError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Network(_) => CompletionError::Network(err.to_string()),
            RetrievalError::Provider(_) => CompletionError::Provider(err.to_string()),
            RetrievalError::Protocol(_) | RetrievalError::Store(_) => CompletionError::Protocol(err.to_string()),
            RetrievalError::Timeout { .. } => CompletionError::Timeout,
            RetrievalError::Cancelled => CompletionError::Cancelled,
        }
    }
}

impl From<PromptError> for CompletionError {
    fn from(err: PromptError) -> Self {
        CompletionError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_and_stale_are_never_user_visible() {
        assert!(!CompletionError::Cancelled.is_user_visible());
        assert!(!CompletionError::Stale.is_user_visible());
    }

    #[test]
    fn provider_and_network_are_user_visible() {
        assert!(CompletionError::Provider("quota exceeded".into()).is_user_visible());
        assert!(CompletionError::Network("connection reset".into()).is_user_visible());
    }

    #[test]
    fn retrieval_timeout_maps_to_timeout() {
        let err: CompletionError = RetrievalError::Timeout { budget_ms: 800 }.into();
        assert!(matches!(err, CompletionError::Timeout));
    }

    #[test]
    fn retrieval_cancelled_maps_to_cancelled() {
        let err: CompletionError = RetrievalError::Cancelled.into();
        assert!(matches!(err, CompletionError::Cancelled));
    }
}
