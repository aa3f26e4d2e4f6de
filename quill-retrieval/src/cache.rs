use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use lru::LruCache;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::RetrievalError;

const DEFAULT_CAPACITY: usize = 500;
const DEFAULT_MAX_MEMORY_BYTES: usize = 50 * 1024 * 1024;

fn cache_key(model: &str, text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    0u8.hash(&mut hasher); // separator so "a"+"bc" and "ab"+"c" never collide
    text.hash(&mut hasher);
    hasher.finish()
}

struct CacheEntry {
    vector: Vec<f32>,
    expires_at: chrono::DateTime<Utc>,
    bytes: usize,
}

/// In-memory LRU embedding cache with a write-through disk tier. Eviction is
/// size-based first (count, then a byte budget), TTL is checked on lookup.
pub struct EmbeddingCache {
    memory: LruCache<u64, CacheEntry>,
    max_memory_bytes: usize,
    memory_bytes_used: usize,
    ttl: Duration,
    disk: Option<Connection>,
}

impl EmbeddingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            memory: LruCache::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap()),
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            memory_bytes_used: 0,
            ttl,
            disk: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.memory = LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap());
        self
    }

    pub fn with_max_memory_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Opens (creating if absent) the disk spillover at `path`.
    pub fn open_disk(mut self, path: &Path) -> Result<Self, RetrievalError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS embedding_cache (
                key INTEGER PRIMARY KEY,
                vector BLOB NOT NULL,
                expires_at INTEGER NOT NULL
            );",
        )?;
        self.disk = Some(conn);
        Ok(self)
    }

    pub fn get(&mut self, model: &str, text: &str) -> Option<Vec<f32>> {
        let key = cache_key(model, text);
        let now = Utc::now();

        if let Some(entry) = self.memory.peek(&key) {
            if entry.expires_at < now {
                self.evict(key);
            } else {
                return self.memory.get(&key).map(|e| e.vector.clone());
            }
        }

        let disk = self.disk.as_ref()?;
        let row: Option<(Vec<u8>, i64)> = disk
            .query_row(
                "SELECT vector, expires_at FROM embedding_cache WHERE key = ?1",
                params![key as i64],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .ok()
            .flatten();

        let (blob, expires_at_ts) = row?;
        let expires_at = chrono::DateTime::from_timestamp(expires_at_ts, 0)?;
        if expires_at < now {
            return None;
        }
        let vector = decode_vector(&blob);
        self.insert_memory(key, vector.clone(), expires_at);
        Some(vector)
    }

    pub fn insert(&mut self, model: &str, text: &str, vector: Vec<f32>) -> Result<(), RetrievalError> {
        let key = cache_key(model, text);
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::seconds(3600));

        self.insert_memory(key, vector.clone(), expires_at);

        if let Some(disk) = &self.disk {
            disk.execute(
                "INSERT INTO embedding_cache (key, vector, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET vector = excluded.vector, expires_at = excluded.expires_at",
                params![key as i64, encode_vector(&vector), expires_at.timestamp()],
            )?;
        }
        Ok(())
    }

    fn insert_memory(&mut self, key: u64, vector: Vec<f32>, expires_at: chrono::DateTime<Utc>) {
        let bytes = vector.len() * std::mem::size_of::<f32>();
        while self.memory_bytes_used + bytes > self.max_memory_bytes {
            let Some((_, evicted)) = self.memory.pop_lru() else {
                break;
            };
            self.memory_bytes_used = self.memory_bytes_used.saturating_sub(evicted.bytes);
        }
        if let Some(old) = self.memory.put(key, CacheEntry { vector, expires_at, bytes }) {
            self.memory_bytes_used = self.memory_bytes_used.saturating_sub(old.bytes);
        }
        self.memory_bytes_used += bytes;
    }

    fn evict(&mut self, key: u64) {
        if let Some(entry) = self.memory.pop(&key) {
            self.memory_bytes_used = self.memory_bytes_used.saturating_sub(entry.bytes);
        }
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
