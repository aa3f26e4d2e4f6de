use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("embedding endpoint returned an error status: {0}")]
    Provider(reqwest::StatusCode),
    #[error("embedding response could not be parsed: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("retrieval budget of {budget_ms}ms exceeded")]
    Timeout { budget_ms: u64 },
    #[error("vector store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("retrieval was cancelled")]
    Cancelled,
}
