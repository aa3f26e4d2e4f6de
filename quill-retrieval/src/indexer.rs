use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::chunk::{chunk_text, content_hash, truncate_for_retry};
use crate::embedding::EmbeddingClient;
use crate::error::RetrievalError;
use crate::vector_store::{RagEntry, VectorStore};
use crate::DocumentId;

#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self { chunk_size: 1_000, chunk_overlap: 100, batch_size: 16 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexProgress {
    pub document_id: DocumentId,
    pub chunks_total: usize,
    pub chunks_done: usize,
    pub chunks_failed: usize,
}

/// Chunks, embeds and persists a document's RAG entries, reporting progress
/// as it goes. A single document's chunks are flushed one INSERT at a time
/// rather than as one batch transaction, so a crash or cancellation loses
/// only chunks not yet embedded.
pub struct BatchIndexer {
    store: Arc<VectorStore>,
    client: EmbeddingClient,
    config: ChunkConfig,
    embed_timeout: Duration,
}

impl BatchIndexer {
    pub fn new(store: Arc<VectorStore>, client: EmbeddingClient, config: ChunkConfig, embed_timeout: Duration) -> Self {
        Self { store, client, config, embed_timeout }
    }

    /// Indexes `text` for `document_id`. Returns `false` without writing
    /// anything if every chunk hash already matches what is stored (a
    /// zero-write no-op reindex).
    pub async fn index_document(
        &self,
        document_id: DocumentId,
        text: &str,
        mut on_progress: impl FnMut(IndexProgress),
    ) -> Result<bool, RetrievalError> {
        let chunks = chunk_text(text, self.config.chunk_size, self.config.chunk_overlap);
        let new_hashes: Vec<String> = chunks.iter().map(|c| content_hash(c)).collect();

        let existing_hashes = self.store.existing_chunk_hashes(document_id)?;
        if existing_hashes == new_hashes {
            on_progress(IndexProgress {
                document_id,
                chunks_total: chunks.len(),
                chunks_done: chunks.len(),
                chunks_failed: 0,
            });
            return Ok(false);
        }

        let mut done = 0;
        let mut failed = 0;

        // batch_size only bounds how often we check back in; writes are
        // still one INSERT per chunk regardless of batch boundaries.
        for (chunk_index, (chunk, hash)) in chunks.iter().zip(new_hashes.iter()).enumerate() {
            match self.embed_with_retry(chunk).await {
                Ok(vector) => {
                    self.store.upsert_chunk(&RagEntry {
                        document_id,
                        chunk_index: chunk_index as u32,
                        chunk_text: chunk.clone(),
                        embedding_vector: vector,
                        content_hash: hash.clone(),
                        created_at: Utc::now(),
                    })?;
                    done += 1;
                }
                Err(err) => {
                    log::warn!("failed to embed chunk {chunk_index} of document {document_id:?}: {err}");
                    failed += 1;
                }
            }
            on_progress(IndexProgress {
                document_id,
                chunks_total: chunks.len(),
                chunks_done: done,
                chunks_failed: failed,
            });
            if (chunk_index + 1) % self.config.batch_size == 0 {
                log::debug!("indexed {done}/{} chunks of document {document_id:?}", chunks.len());
            }
        }

        self.store.delete_chunks_from(document_id, chunks.len() as u32)?;
        Ok(true)
    }

    /// Embeds `text`, retrying once with a truncated chunk if the endpoint
    /// rejects it as oversize (HTTP 413).
    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        match self.client.embed(text, self.embed_timeout).await {
            Err(RetrievalError::Provider(status)) if status.as_u16() == 413 => {
                let truncated = truncate_for_retry(text);
                self.client.embed(&truncated, self.embed_timeout).await
            }
            other => other,
        }
    }
}
