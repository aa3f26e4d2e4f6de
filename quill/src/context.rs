//! `CoreContext`: the explicit, injected handle every component receives
//! instead of a global mutable singleton (spec §9's design note that
//! "global mutable singletons ... become explicit, injected handles").
//! Bundles configuration, the template registry, the worker-pool sizing,
//! the vector store and the completion client - everything needed to
//! build a [`Pipeline`] for one or more editor surfaces.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use quill_client::CompletionClient;
use quill_doc::{DocumentId, TriggerEvent};
use quill_prompt::{PromptBuilder, ProjectMeta, TemplateRegistry};
use quill_retrieval::{EmbeddingClient, RetrievalEngine, VectorStore};
use quill_trigger::{DocumentSource, FallbackCorpus, Pipeline, TriggerConfig};
use tokio::sync::{broadcast, mpsc, Semaphore};

use crate::config::{self, CoreConfig};
use crate::error::CompletionError;
use crate::surface::Surface;

/// Process-wide handles shared by every surface. Reloading configuration
/// (`CoreContext::reload_config`) swaps it atomically behind an
/// `ArcSwap`; nothing holding a `CoreContext` needs to be rebuilt - the
/// same read-mostly, swap-on-reload pattern used for the trigger and
/// launch policy below.
pub struct CoreContext {
    pub config: Arc<ArcSwap<CoreConfig>>,
    pub prompt_builder: Arc<PromptBuilder>,
    pub store: Option<Arc<VectorStore>>,
    pub retrieval: Option<Arc<RetrievalEngine>>,
    pub client: Arc<CompletionClient>,
    /// Bounds concurrent launches across every surface sharing this
    /// context (spec §5: "bounded parallelism, default equal to the
    /// number of active surfaces, minimum 2").
    worker_permits: Arc<Semaphore>,
    /// The trigger gate's debounce/throttle/heuristic policy, re-derived
    /// from `config` on every `reload_config` so every surface built from
    /// this context picks up a policy change on its very next event.
    trigger_config: Arc<ArcSwap<TriggerConfig>>,
}

impl CoreContext {
    /// Builds a context from `config`. `template_dir`, when given, is
    /// watched for user-authored `*.toml` templates layered over the
    /// built-ins (see `quill_prompt::TemplateRegistry::load`); `None`
    /// loads only the embedded built-ins. `store_path` opens (or
    /// creates) the project's vector store when RAG is enabled; `None`
    /// with RAG enabled falls back to an in-memory store, useful for
    /// tests and for a project that has not chosen a persistence
    /// location yet. `active_surfaces` sizes the worker pool, floored at
    /// 2 regardless of how small a value is passed.
    pub fn new(
        config: CoreConfig,
        template_dir: Option<&Path>,
        store_path: Option<&Path>,
        active_surfaces: usize,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::new();
        let templates = match template_dir {
            Some(dir) => TemplateRegistry::load(dir)?,
            None => TemplateRegistry::builtin_only()?,
        };

        let client = Arc::new(CompletionClient::new(http.clone(), config.client_config()));

        let (store, retrieval) = if config.rag.enabled {
            let store = Arc::new(match store_path {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)
                            .map_err(|err| CompletionError::Configuration(format!("{}: {err}", parent.display())))?;
                    }
                    VectorStore::open(path)?
                }
                None => VectorStore::in_memory()?,
            });
            let embedding_client = EmbeddingClient::new(http, config.rag.embedding.endpoint.clone(), config.rag.embedding.model.clone());
            let engine = RetrievalEngine::new(embedding_client, Arc::clone(&store), config.rag.embedding.model.clone(), config.retrieval_engine_config());
            (Some(store), Some(Arc::new(engine)))
        } else {
            (None, None)
        };

        let trigger_config = Arc::new(ArcSwap::from_pointee(config.trigger_config()));

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            prompt_builder: Arc::new(PromptBuilder::new(templates)),
            store,
            retrieval,
            client,
            worker_permits: Arc::new(Semaphore::new(active_surfaces.max(2))),
            trigger_config,
        })
    }

    /// Loads `CoreConfig` from the user-scoped configuration directory
    /// (or its defaults, if no file exists yet) and builds a context from
    /// it. Templates load from `config_dir()/templates`, the vector
    /// store from under the platform data directory, keyed by
    /// `project_slug`.
    pub fn from_user_config(project_slug: &str, active_surfaces: usize) -> Result<Self, CompletionError> {
        let config = CoreConfig::load(&config::config_file())?;
        let templates_dir = config::templates_dir();
        let store_path = config.rag.enabled.then(|| config::vector_store_path(project_slug));
        Self::new(config, Some(&templates_dir), store_path.as_deref(), active_surfaces)
    }

    /// Atomically replaces the live configuration. Does not rebuild the
    /// vector store, HTTP clients, or template registry - those only
    /// change on the next `CoreContext::new` (a provider endpoint or RAG
    /// toggle change requires a fresh context, not just a config reload).
    pub fn reload_config(&self, new_config: CoreConfig) {
        self.trigger_config.store(Arc::new(new_config.trigger_config()));
        self.config.store(Arc::new(new_config));
    }

    /// Assembles a [`Pipeline`] for one surface (or a group of surfaces
    /// that share a document store and fallback corpus). Every surface's
    /// `TriggerGate` is built over a `Pipeline` constructed this way so
    /// they share the worker pool's backpressure and the one prompt
    /// builder instance.
    pub fn build_pipeline(
        &self,
        documents: Arc<dyn DocumentSource>,
        fallback: Option<Arc<dyn FallbackCorpus>>,
        results: mpsc::Sender<quill_client::CompletionResult>,
        launches: mpsc::Sender<quill_client::RequestId>,
    ) -> Arc<Pipeline> {
        Arc::new(Pipeline {
            documents,
            retrieval: self.retrieval.clone(),
            fallback,
            prompt_builder: Arc::clone(&self.prompt_builder),
            client: Arc::clone(&self.client),
            results,
            worker_permits: Arc::clone(&self.worker_permits),
            launches,
        })
    }

    /// Builds a ready-to-use [`Surface`] for one document: allocates its
    /// result/launch channels, assembles a [`Pipeline`] from them, and
    /// wires the launch policy for this call's `project_meta` and
    /// `template_id`. This is the one-call path most hosts want; use
    /// [`CoreContext::build_pipeline`] directly only when several
    /// surfaces need to share one pipeline's document store.
    pub fn build_surface(
        &self,
        document_id: DocumentId,
        documents: Arc<dyn DocumentSource>,
        fallback: Option<Arc<dyn FallbackCorpus>>,
        edit_events: broadcast::Receiver<TriggerEvent>,
        project_meta: ProjectMeta,
        template_id: Option<String>,
    ) -> Surface {
        let (results_tx, results_rx) = mpsc::channel(4);
        let (launches_tx, launches_rx) = mpsc::channel(4);
        let pipeline = self.build_pipeline(documents, fallback, results_tx, launches_tx);
        let launch_config = Arc::new(ArcSwap::from_pointee(self.config.load().launch_config(project_meta, template_id)));
        Surface::new(document_id, Arc::clone(&self.trigger_config), launch_config, pipeline, edit_events, launches_rx, results_rx)
    }
}
