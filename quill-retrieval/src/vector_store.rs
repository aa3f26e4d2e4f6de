use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::error::RetrievalError;
use crate::DocumentId;

#[derive(Debug, Clone, PartialEq)]
pub struct RagEntry {
    pub document_id: DocumentId,
    pub chunk_index: u32,
    pub chunk_text: String,
    pub embedding_vector: Vec<f32>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub document_id: DocumentId,
    pub chunk_index: u32,
    pub chunk_text: String,
    pub score: f32,
}

/// RAG entry storage. Reads and writes are serialized through a single
/// mutex-guarded connection: a per-project store is small enough that this
/// costs nothing in practice, and it trivially gives us the single-writer
/// discipline without a connection pool.
pub struct VectorStore {
    conn: Mutex<Connection>,
}

impl VectorStore {
    pub fn open(path: &Path) -> Result<Self, RetrievalError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS rag_entries (
                document_id INTEGER NOT NULL,
                chunk_index INTEGER NOT NULL,
                chunk_text TEXT NOT NULL,
                embedding_vector BLOB NOT NULL,
                content_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (document_id, chunk_index)
            );
            CREATE INDEX IF NOT EXISTS idx_rag_entries_document_id ON rag_entries(document_id);",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self, RetrievalError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE rag_entries (
                document_id INTEGER NOT NULL,
                chunk_index INTEGER NOT NULL,
                chunk_text TEXT NOT NULL,
                embedding_vector BLOB NOT NULL,
                content_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (document_id, chunk_index)
            );
            CREATE INDEX idx_rag_entries_document_id ON rag_entries(document_id);",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// The chunk hashes currently stored for `document_id`, in chunk order.
    /// An empty reindex diff (same hashes, same count) means the caller can
    /// skip the write entirely.
    pub fn existing_chunk_hashes(&self, document_id: DocumentId) -> Result<Vec<String>, RetrievalError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT content_hash FROM rag_entries WHERE document_id = ?1 ORDER BY chunk_index",
        )?;
        let hashes = stmt
            .query_map(params![document_id.raw() as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(hashes)
    }

    /// Atomically replaces every chunk belonging to `document_id`.
    pub fn replace_document(&self, document_id: DocumentId, entries: &[RagEntry]) -> Result<(), RetrievalError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM rag_entries WHERE document_id = ?1", params![document_id.raw() as i64])?;
        for entry in entries {
            tx.execute(
                "INSERT INTO rag_entries (document_id, chunk_index, chunk_text, embedding_vector, content_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.document_id.raw() as i64,
                    entry.chunk_index,
                    entry.chunk_text,
                    encode_vector(&entry.embedding_vector),
                    entry.content_hash,
                    entry.created_at.timestamp(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Writes or overwrites a single chunk. Used by the batch indexer so a
    /// crash mid-document loses only chunks not yet flushed, rather than
    /// the whole document as [`Self::replace_document`] would on rollback.
    pub fn upsert_chunk(&self, entry: &RagEntry) -> Result<(), RetrievalError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO rag_entries (document_id, chunk_index, chunk_text, embedding_vector, content_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(document_id, chunk_index) DO UPDATE SET
                chunk_text = excluded.chunk_text,
                embedding_vector = excluded.embedding_vector,
                content_hash = excluded.content_hash,
                created_at = excluded.created_at",
            params![
                entry.document_id.raw() as i64,
                entry.chunk_index,
                entry.chunk_text,
                encode_vector(&entry.embedding_vector),
                entry.content_hash,
                entry.created_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Removes chunks at or beyond `from_index`, used to drop leftover
    /// chunks from a previous, longer version of the document.
    pub fn delete_chunks_from(&self, document_id: DocumentId, from_index: u32) -> Result<(), RetrievalError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM rag_entries WHERE document_id = ?1 AND chunk_index >= ?2",
            params![document_id.raw() as i64, from_index],
        )?;
        Ok(())
    }

    pub fn remove_document(&self, document_id: DocumentId) -> Result<(), RetrievalError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM rag_entries WHERE document_id = ?1", params![document_id.raw() as i64])?;
        Ok(())
    }

    pub fn is_empty(&self) -> Result<bool, RetrievalError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM rag_entries", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    /// Full scan, cosine similarity in process. A per-project store is
    /// expected to hold thousands, not millions, of chunks - no vector
    /// index extension is worth the dependency at this scale.
    pub fn search(&self, query_vector: &[f32], top_k: usize, min_similarity: f32) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT document_id, chunk_index, chunk_text, embedding_vector FROM rag_entries")?;
        let rows = stmt.query_map([], |row| {
            let document_id: i64 = row.get(0)?;
            let chunk_index: u32 = row.get(1)?;
            let chunk_text: String = row.get(2)?;
            let blob: Vec<u8> = row.get(3)?;
            Ok((document_id, chunk_index, chunk_text, blob))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (document_id, chunk_index, chunk_text, blob) = row?;
            let vector = decode_vector(&blob);
            let score = cosine_similarity(query_vector, &vector);
            if score >= min_similarity {
                scored.push(ScoredChunk { document_id: DocumentId::from_raw(document_id as u64), chunk_index, chunk_text, score });
            }
        }
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(document_id: u64, chunk_index: u32, text: &str, vector: Vec<f32>) -> RagEntry {
        RagEntry {
            document_id: DocumentId::from_raw(document_id),
            chunk_index,
            chunk_text: text.to_string(),
            embedding_vector: vector,
            content_hash: format!("hash-{chunk_index}"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn search_ranks_by_cosine_similarity() {
        let store = VectorStore::in_memory().unwrap();
        store
            .replace_document(
                DocumentId::from_raw(1),
                &[
                    entry(1, 0, "close match", vec![1.0, 0.0]),
                    entry(1, 1, "far match", vec![0.0, 1.0]),
                ],
            )
            .unwrap();

        let results = store.search(&[1.0, 0.0], 5, 0.0).unwrap();
        assert_eq!(results[0].chunk_text, "close match");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn empty_store_reports_empty() {
        let store = VectorStore::in_memory().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn replace_document_is_transactional() {
        let store = VectorStore::in_memory().unwrap();
        store.replace_document(DocumentId::from_raw(1), &[entry(1, 0, "a", vec![1.0])]).unwrap();
        store.replace_document(DocumentId::from_raw(1), &[entry(1, 0, "b", vec![2.0])]).unwrap();
        let hashes = store.existing_chunk_hashes(DocumentId::from_raw(1)).unwrap();
        assert_eq!(hashes.len(), 1);
    }
}
