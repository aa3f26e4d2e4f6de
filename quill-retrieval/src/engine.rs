use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quill_event::{cancelable_future, CancelRx};
use tokio::time::Instant;

use crate::breaker::CircuitBreaker;
use crate::cache::EmbeddingCache;
use crate::embedding::EmbeddingClient;
use crate::error::RetrievalError;
use crate::lexical::{lexical_search, LexicalDocument};
use crate::vector_store::{ScoredChunk, VectorStore};

/// Fraction of `budget_ms` the embedding call itself is allowed to consume;
/// the remainder covers vector search and an optional rerank pass.
const EMBEDDING_BUDGET_SHARE: f64 = 0.70;

/// Minimum time remaining (ms) after the vector search for a rerank pass to
/// be attempted at all.
const RERANK_THRESHOLD_MS: u64 = 150;

/// Minimum number of hits before a rerank pass is worth the extra call.
const RERANK_MIN_RESULTS: usize = 3;

type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub trait Reranker: Send + Sync {
    fn rerank<'a>(&'a self, query: &'a str, items: Vec<ScoredChunk>) -> BoxFuture<'a, Vec<ScoredChunk>>;
}

#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub items: Vec<(crate::DocumentId, u32, String, f32)>,
    pub used_fallback: bool,
}

pub struct RetrievalEngineConfig {
    pub breaker_cooldown: Duration,
    pub cache_ttl: Duration,
    pub cancel_ms: u64,
    pub fallback_enabled: bool,
}

impl Default for RetrievalEngineConfig {
    fn default() -> Self {
        Self {
            breaker_cooldown: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(3600),
            cancel_ms: 200,
            fallback_enabled: true,
        }
    }
}

pub struct RetrievalEngine {
    cache: Mutex<EmbeddingCache>,
    breaker: Mutex<CircuitBreaker>,
    client: EmbeddingClient,
    store: Arc<VectorStore>,
    reranker: Option<Box<dyn Reranker>>,
    config: RetrievalEngineConfig,
    embedding_model: String,
}

impl RetrievalEngine {
    pub fn new(client: EmbeddingClient, store: Arc<VectorStore>, embedding_model: impl Into<String>, config: RetrievalEngineConfig) -> Self {
        Self {
            cache: Mutex::new(EmbeddingCache::new(config.cache_ttl)),
            breaker: Mutex::new(CircuitBreaker::new(config.breaker_cooldown)),
            client,
            store,
            reranker: None,
            config,
            embedding_model: embedding_model.into(),
        }
    }

    pub fn with_reranker(mut self, reranker: Box<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Runs the retrieval pipeline end to end, never blocking the caller
    /// longer than `budget_ms + cancel_ms`.
    pub async fn retrieve(
        &self,
        query_text: &str,
        query_cap: usize,
        top_k: usize,
        budget_ms: u64,
        min_similarity: f32,
        fallback_documents: &[LexicalDocument],
        cancel: CancelRx,
    ) -> Result<RetrievalResult, RetrievalError> {
        let deadline = Instant::now() + Duration::from_millis(budget_ms);
        let query: String = query_text.chars().take(query_cap).collect();

        let run = async {
            if self.breaker.lock().is_open() {
                return Ok(self.fallback(&query, top_k, fallback_documents));
            }

            let cached = self.cache.lock().get(&self.embedding_model, &query);
            let vector = match cached {
                Some(v) => v,
                None => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let embed_timeout = Duration::from_millis(
                        (remaining.as_millis() as f64 * EMBEDDING_BUDGET_SHARE) as u64,
                    );
                    match self.client.embed(&query, embed_timeout).await {
                        Ok(v) => {
                            self.breaker.lock().reset();
                            let _ = self.cache.lock().insert(&self.embedding_model, &query, v.clone());
                            v
                        }
                        Err(err) => {
                            self.breaker.lock().trip();
                            log::warn!("embedding request failed, tripping circuit breaker: {err}");
                            return Ok(self.fallback(&query, top_k, fallback_documents));
                        }
                    }
                }
            };

            if Instant::now() >= deadline {
                self.breaker.lock().trip();
                return Ok(self.fallback(&query, top_k, fallback_documents));
            }

            let mut items = self.store.search(&vector, top_k, min_similarity)?;

            let remaining_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64;
            if let Some(reranker) = &self.reranker {
                if items.len() >= RERANK_MIN_RESULTS && remaining_ms >= RERANK_THRESHOLD_MS && !self.breaker.lock().is_open() {
                    items = reranker.rerank(&query, items).await;
                }
            }

            Ok(RetrievalResult {
                items: items
                    .into_iter()
                    .map(|c| (c.document_id, c.chunk_index, c.chunk_text, c.score))
                    .collect(),
                used_fallback: false,
            })
        };

        let cancel_budget = Duration::from_millis(budget_ms + self.config.cancel_ms);
        match cancelable_future(tokio::time::timeout(cancel_budget, run), cancel).await {
            None => Err(RetrievalError::Cancelled),
            Some(Err(_elapsed)) => {
                self.breaker.lock().trip();
                Err(RetrievalError::Timeout { budget_ms })
            }
            Some(Ok(result)) => result,
        }
    }

    fn fallback(&self, query: &str, top_k: usize, documents: &[LexicalDocument]) -> RetrievalResult {
        if !self.config.fallback_enabled {
            return RetrievalResult { items: Vec::new(), used_fallback: true };
        }
        let items = lexical_search(query, documents, top_k, 0.1)
            .into_iter()
            .filter_map(|(id, score)| {
                documents
                    .iter()
                    .find(|d| d.document_id == id)
                    .map(|d| (id, 0u32, d.text.clone(), score))
            })
            .collect();
        RetrievalResult { items, used_fallback: true }
    }
}
