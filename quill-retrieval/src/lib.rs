//! Retrieval-augmented-generation engine (component C4): an embedding
//! cache, a local vector store, a lexical fallback and a circuit breaker,
//! wired together behind a single timeout- and cancellation-aware
//! `retrieve` call. Kept independent of `quill-doc`'s live document model -
//! this crate runs on a worker context and only ever sees text snapshots
//! and stable ids, never a document handle.

mod breaker;
mod cache;
mod chunk;
mod embedding;
mod engine;
mod error;
mod indexer;
mod lexical;
mod vector_store;

use std::sync::atomic::{AtomicU64, Ordering};

pub use breaker::CircuitBreaker;
pub use cache::EmbeddingCache;
pub use chunk::{chunk_text, content_hash, truncate_for_retry};
pub use embedding::EmbeddingClient;
pub use engine::{RetrievalEngine, RetrievalEngineConfig, RetrievalResult, Reranker};
pub use error::RetrievalError;
pub use indexer::{BatchIndexer, ChunkConfig, IndexProgress};
pub use lexical::{lexical_search, LexicalDocument};
pub use vector_store::{RagEntry, ScoredChunk, VectorStore};

/// Stable document identifier, independent of [`quill_doc::DocumentId`] so
/// that this crate never needs a live document handle - only a snapshot's
/// text and whatever id the host chooses to tag it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}
