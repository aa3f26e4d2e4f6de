use thiserror::Error;

/// The classification carried in a [`crate::CompletionStatus::Error`] -
/// copyable and comparable, unlike the underlying [`ClientError`] which
/// carries the original `reqwest`/`serde_json` error for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    Network,
    Provider,
    Protocol,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("completion request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("completion endpoint returned a provider-side error (status {status}): {message}")]
    Provider { status: reqwest::StatusCode, message: String },
    #[error("completion response could not be parsed: {0}")]
    Protocol(String),
    #[error("streaming connection failed: {0}")]
    Stream(#[from] reqwest_eventsource::Error),
}

impl ClientError {
    pub fn kind(&self) -> ClientErrorKind {
        match self {
            ClientError::Network(_) | ClientError::Stream(_) => ClientErrorKind::Network,
            ClientError::Provider { .. } => ClientErrorKind::Provider,
            ClientError::Protocol(_) => ClientErrorKind::Protocol,
        }
    }
}
