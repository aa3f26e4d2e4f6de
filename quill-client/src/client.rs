use std::time::Duration;

use quill_event::{cancelable_future, CancelRx};
use tokio::time::Instant as TokioInstant;

use crate::error::ClientError;
use crate::request::CompletionRequest;
use crate::result::{CompletionResult, Usage};
use crate::retry::with_retry;
use crate::wire::{ChatMessage, ChatRequest, ChatResponse, StreamChunk};

/// Static configuration for an OpenAI-compatible completion endpoint
/// (`provider.endpoint`, `provider.api_key`, `provider.model`).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// Issues cancellable blocking or streaming calls to a remote completion
/// model and tags every result with its originating `request_id`
/// (component C6). Results are never cached here - deduplication is a
/// concern of the layer above (`quill-ghost`).
pub struct CompletionClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl CompletionClient {
    pub fn new(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    fn model_for(&self, req: &CompletionRequest) -> String {
        req.model.clone().unwrap_or_else(|| self.config.model.clone())
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Performs one blocking request, returning a single terminal
    /// [`CompletionResult`]. Aborts the HTTP connection and returns
    /// `Cancelled` if `cancel` fires before the deadline.
    pub async fn complete(&self, req: &CompletionRequest, cancel: CancelRx) -> CompletionResult {
        let deadline = tokio_deadline(req.deadline);
        let run = with_retry(req.idempotent, || self.send_once(req));

        match cancelable_future(tokio::time::timeout_at(deadline, run), cancel).await {
            None => CompletionResult::cancelled(req.request_id),
            Some(Err(_elapsed)) => CompletionResult::timeout(req.request_id),
            Some(Ok(Ok((text, usage)))) => CompletionResult::ok(req.request_id, text, usage),
            Some(Ok(Err(err))) => {
                log::warn!("completion request {:?} failed: {err}", req.request_id.raw());
                CompletionResult::error(req.request_id, err.kind())
            }
        }
    }

    async fn send_once(&self, req: &CompletionRequest) -> Result<(String, Option<Usage>), ClientError> {
        let body = ChatRequest {
            model: self.model_for(req),
            messages: vec![ChatMessage { role: "user", content: req.prompt.clone() }],
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            stream: false,
        };

        let response = self
            .authorize(self.http.post(&self.config.endpoint).json(&body))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Provider { status, message });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Protocol(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .ok_or_else(|| ClientError::Protocol("completion response had no choices".to_string()))?;

        let usage = parsed.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        Ok((text, usage))
    }

    /// Streams incremental `delta.content` chunks to `on_chunk`, returning
    /// the same terminal [`CompletionResult`] shape as [`Self::complete`]
    /// once the stream ends. Streaming requests are never retried - a
    /// partially delivered stream is not safely replayable.
    pub async fn complete_stream(
        &self,
        req: &CompletionRequest,
        cancel: CancelRx,
        mut on_chunk: impl FnMut(&str) + Send,
    ) -> CompletionResult {
        let deadline = tokio_deadline(req.deadline);
        let run = self.stream_once(req, &mut on_chunk);

        match cancelable_future(tokio::time::timeout_at(deadline, run), cancel).await {
            None => CompletionResult::cancelled(req.request_id),
            Some(Err(_elapsed)) => CompletionResult::timeout(req.request_id),
            Some(Ok(Ok(text))) => CompletionResult::ok(req.request_id, text, None),
            Some(Ok(Err(err))) => {
                log::warn!("streaming completion {:?} failed: {err}", req.request_id.raw());
                CompletionResult::error(req.request_id, err.kind())
            }
        }
    }

    async fn stream_once(
        &self,
        req: &CompletionRequest,
        on_chunk: &mut (impl FnMut(&str) + Send),
    ) -> Result<String, ClientError> {
        use futures_util::StreamExt;
        use reqwest_eventsource::{Event, EventSource};

        let body = ChatRequest {
            model: self.model_for(req),
            messages: vec![ChatMessage { role: "user", content: req.prompt.clone() }],
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            stream: true,
        };

        let builder = self.authorize(self.http.post(&self.config.endpoint).json(&body));
        let mut source = EventSource::new(builder).map_err(|e| ClientError::Protocol(e.to_string()))?;
        let mut full = String::new();

        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.data == "[DONE]" {
                        break;
                    }
                    let chunk: StreamChunk = serde_json::from_str(&message.data)
                        .map_err(|e| ClientError::Protocol(e.to_string()))?;
                    if let Some(delta) = chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
                        on_chunk(&delta);
                        full.push_str(&delta);
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(err) => return Err(err.into()),
            }
        }

        source.close();
        Ok(full)
    }
}

fn tokio_deadline(deadline: std::time::Instant) -> TokioInstant {
    let remaining = deadline.saturating_duration_since(std::time::Instant::now());
    TokioInstant::now() + remaining.max(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            request_id: crate::RequestId::from_raw(1),
            prompt: prompt.to_string(),
            max_tokens: 64,
            temperature: 0.8,
            top_p: None,
            model: None,
            deadline: Instant::now() + Duration::from_millis(50),
            idempotent: false,
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_network_error() {
        let client = CompletionClient::new(
            reqwest::Client::new(),
            ClientConfig { endpoint: "http://127.0.0.1:1/v1/chat/completions".into(), api_key: None, model: "test".into() },
        );
        let (_tx, rx) = quill_event::cancelation();
        let result = client.complete(&request("hello"), rx).await;
        assert!(matches!(result.status, crate::CompletionStatus::Error(crate::ClientErrorKind::Network) | crate::CompletionStatus::Timeout));
    }

    #[tokio::test]
    async fn cancellation_before_completion_yields_cancelled() {
        let client = CompletionClient::new(
            reqwest::Client::new(),
            ClientConfig { endpoint: "http://127.0.0.1:1/v1/chat/completions".into(), api_key: None, model: "test".into() },
        );
        let (tx, rx) = quill_event::cancelation();
        drop(tx);
        let mut req = request("hello");
        req.deadline = Instant::now() + Duration::from_secs(5);
        let result = client.complete(&req, rx).await;
        assert_eq!(result.status, crate::CompletionStatus::Cancelled);
    }
}
