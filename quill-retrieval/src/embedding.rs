use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self { http, endpoint: endpoint.into(), model: model.into() }
    }

    /// Requests an embedding for `text`, bounded by `timeout`. A 413 maps to
    /// [`RetrievalError::Provider`] with that status so callers can retry
    /// with a truncated chunk.
    pub async fn embed(&self, text: &str, timeout: Duration) -> Result<Vec<f32>, RetrievalError> {
        use serde::de::Error as _;

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&EmbeddingRequest { model: &self.model, input: text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RetrievalError::Provider(response.status()));
        }

        let bytes = response.bytes().await?;
        let body: EmbeddingResponse = serde_json::from_slice(&bytes)?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RetrievalError::Protocol(serde_json::Error::custom("embedding response had no data entries")))
    }
}
