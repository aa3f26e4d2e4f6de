//! [`CoreConfig`]: the recognized configuration options for the
//! completion core. Persisted as JSON under a user-scoped configuration
//! directory - machine-written settings rather than author-edited prose
//! (the template registry, by contrast, stays TOML; see
//! `quill_prompt::TemplateRegistry`).
//!
//! Every field carries `#[serde(default)]` so a partial on-disk file, or
//! none at all, still produces a usable configuration.

use std::path::{Path, PathBuf};

use etcetera::base_strategy::{choose_base_strategy, BaseStrategy};
use quill_context::PromptMode;
use quill_retrieval::ChunkConfig;
use quill_trigger::{CompletionMode, TriggerConfig};
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub enabled: bool,
    pub mode: CompletionMode,
    pub debounce_ms: u64,
    pub throttle_ms: u64,
    pub min_chars: usize,
    pub punctuation_assist: bool,
    pub prompt_mode: PromptMode,
    pub auto_chain: bool,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        let defaults = TriggerConfig::default();
        Self {
            enabled: defaults.completion_enabled,
            mode: defaults.mode,
            debounce_ms: defaults.debounce_ms,
            throttle_ms: defaults.throttle_ms,
            min_chars: defaults.min_chars,
            punctuation_assist: defaults.punctuation_assist,
            prompt_mode: defaults.prompt_mode,
            auto_chain: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            timeout_ms: 8_000,
            temperature: 0.7,
            top_p: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub endpoint: String,
    pub model: String,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { endpoint: "https://api.openai.com/v1/embeddings".into(), model: "text-embedding-3-small".into(), batch_size: 16 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub enabled: bool,
    pub model: String,
    pub top_k: usize,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self { enabled: false, model: String::new(), top_k: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub max_retries: u32,
    pub timeout_ms: u64,
    /// Not in spec's recognized-options table verbatim, but required by
    /// the retrieval engine's circuit breaker (spec §4.4): how long a
    /// tripped breaker stays open before the next call is allowed to
    /// probe the network again.
    pub circuit_breaker_cooldown_s: u64,
    /// How long the retrieval call tolerates cancellation propagation
    /// past `budget_ms` before giving up entirely (spec §4.4, §5).
    pub cancel_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self { max_retries: 2, timeout_ms: 5_000, circuit_breaker_cooldown_s: 30, cancel_ms: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub memory_size: usize,
    pub ttl_s: u64,
    pub max_memory_mb: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { memory_size: 500, ttl_s: 3_600, max_memory_mb: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub enabled: bool,
    pub embedding: EmbeddingSettings,
    pub rerank: RerankSettings,
    pub similarity_threshold: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub network: NetworkSettings,
    pub cache: CacheSettings,
    pub fallback_enabled: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            embedding: EmbeddingSettings::default(),
            rerank: RerankSettings::default(),
            similarity_threshold: 0.2,
            chunk_size: 1_000,
            chunk_overlap: 100,
            network: NetworkSettings::default(),
            cache: CacheSettings::default(),
            fallback_enabled: true,
        }
    }
}

/// The complete set of recognized configuration options (spec §6),
/// serialized as one JSON document. `#[serde(default)]` on every nested
/// struct means loading a file that only sets `completion.debounce_ms`
/// still produces sensible defaults for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub completion: CompletionSettings,
    pub provider: ProviderSettings,
    pub rag: RagSettings,
}

impl CoreConfig {
    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig {
            mode: self.completion.mode,
            completion_enabled: self.completion.enabled,
            debounce_ms: self.completion.debounce_ms,
            throttle_ms: self.completion.throttle_ms,
            min_chars: self.completion.min_chars,
            punctuation_assist: self.completion.punctuation_assist,
            prompt_mode: self.completion.prompt_mode,
            auto_chain: self.completion.auto_chain,
        }
    }

    pub fn client_config(&self) -> quill_client::ClientConfig {
        quill_client::ClientConfig {
            endpoint: self.provider.endpoint.clone(),
            api_key: self.provider.api_key.clone(),
            model: self.provider.model.clone(),
        }
    }

    pub fn retrieval_engine_config(&self) -> quill_retrieval::RetrievalEngineConfig {
        quill_retrieval::RetrievalEngineConfig {
            breaker_cooldown: std::time::Duration::from_secs(self.rag.network.circuit_breaker_cooldown_s),
            cache_ttl: std::time::Duration::from_secs(self.rag.cache.ttl_s),
            cancel_ms: self.rag.network.cancel_ms,
            fallback_enabled: self.rag.fallback_enabled,
        }
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig { chunk_size: self.rag.chunk_size, chunk_overlap: self.rag.chunk_overlap, batch_size: self.rag.embedding.batch_size }
    }

    pub fn launch_config(&self, project_meta: quill_prompt::ProjectMeta, template_id: Option<String>) -> quill_trigger::LaunchConfig {
        quill_trigger::LaunchConfig {
            rag_enabled: self.rag.enabled,
            retrieval_budget_ms: self.rag.network.timeout_ms,
            min_similarity: self.rag.similarity_threshold,
            provider_timeout_ms: self.provider.timeout_ms,
            temperature: self.provider.temperature,
            top_p: self.provider.top_p,
            model: None,
            project_meta,
            template_id,
        }
    }

    /// Loads `path`, merging defaults for any field the file omits.
    /// A missing file is not an error - it is exactly the same as an
    /// empty `{}` document.
    pub fn load(path: &Path) -> Result<Self, CompletionError> {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|source| CompletionError::Configuration(format!("{}: {source}", path.display()))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(CompletionError::Configuration(format!("{}: {err}", path.display()))),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CompletionError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| CompletionError::Configuration(format!("{}: {err}", parent.display())))?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|err| CompletionError::Configuration(format!("serializing config: {err}")))?;
        std::fs::write(path, text).map_err(|err| CompletionError::Configuration(format!("{}: {err}", path.display())))
    }
}

/// `$XDG_CONFIG_HOME/quill` (or the platform equivalent).
pub fn config_dir() -> PathBuf {
    let strategy = choose_base_strategy().expect("unable to determine the platform configuration directory");
    let mut path = strategy.config_dir();
    path.push("quill");
    path
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.json")
}

pub fn templates_dir() -> PathBuf {
    config_dir().join("templates")
}

pub fn vector_store_path(project_slug: &str) -> PathBuf {
    let mut path = choose_base_strategy().expect("unable to determine the platform data directory").data_dir();
    path.push("quill");
    path.push("projects");
    path.push(project_slug);
    path.push("rag.sqlite3");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let config = CoreConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let parsed: CoreConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn partial_document_fills_in_defaults() {
        let partial = r#"{"completion": {"debounce_ms": 900}}"#;
        let config: CoreConfig = serde_json::from_str(partial).unwrap();
        assert_eq!(config.completion.debounce_ms, 900);
        assert_eq!(config.completion.throttle_ms, CompletionSettings::default().throttle_ms);
        assert_eq!(config.rag.chunk_size, RagSettings::default().chunk_size);
    }

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::load(&dir.path().join("does-not-exist.json")).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = CoreConfig::default();
        config.completion.min_chars = 7;
        config.save(&path).unwrap();
        let loaded = CoreConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn corrupt_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = CoreConfig::load(&path).unwrap_err();
        assert!(matches!(err, CompletionError::Configuration(_)));
    }
}
