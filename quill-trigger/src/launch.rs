use std::sync::Arc;
use std::time::{Duration, Instant};

use quill_client::{CompletionClient, CompletionRequest, CompletionResult, RequestId};
use quill_context::{extract_window, PromptMode};
use quill_doc::{DocumentId, Revision};
use quill_event::CancelRx;
use quill_prompt::{PromptBuilder, PromptInputs, ProjectMeta, RagChunk};
use quill_retrieval::{LexicalDocument, RetrievalEngine};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};

/// A cheap, self-contained copy of a document's state at trigger time. A
/// `Rope` clone is O(1) structural sharing, not a deep copy, so handing
/// this across the editor-thread/worker-pool boundary is inexpensive.
pub struct DocumentSnapshot {
    pub document_id: DocumentId,
    pub revision: Revision,
    pub cursor: usize,
    pub text: quill_doc::Rope,
}

/// The editor thread's document store, as seen from the worker side. Kept
/// as a trait because this crate has no opinion on how documents are
/// stored - only that a snapshot can be produced cheaply and without
/// blocking.
pub trait DocumentSource: Send + Sync {
    fn snapshot(&self, document_id: DocumentId) -> Option<DocumentSnapshot>;
}

/// The project's open documents, sampled for the lexical fallback when
/// retrieval's circuit breaker is open.
pub trait FallbackCorpus: Send + Sync {
    fn documents(&self) -> Vec<LexicalDocument>;
}

/// Provider- and RAG-facing knobs for one launch, distinct from
/// [`crate::TriggerConfig`]'s debounce/throttle policy - these configure
/// what happens *after* the gate has already decided to launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub rag_enabled: bool,
    pub retrieval_budget_ms: u64,
    pub min_similarity: f32,
    pub provider_timeout_ms: u64,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub model: Option<String>,
    pub project_meta: ProjectMeta,
    pub template_id: Option<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            rag_enabled: true,
            retrieval_budget_ms: 800,
            min_similarity: 0.2,
            provider_timeout_ms: 8_000,
            temperature: 0.7,
            top_p: None,
            model: None,
            project_meta: ProjectMeta::default(),
            template_id: None,
        }
    }
}

/// Everything the async orchestration (C3 -> C4 -> C5 -> C6) needs, wired
/// up once at startup and shared across every trigger.
///
/// `worker_permits` bounds how many launches may run concurrently across
/// every surface sharing this pipeline (spec's "worker pool with bounded
/// parallelism, default equal to the number of active surfaces, minimum
/// 2"). A surface whose gate cannot acquire a permit drops the launch
/// rather than queuing it - the pipeline is not a queue.
pub struct Pipeline {
    pub documents: Arc<dyn DocumentSource>,
    pub retrieval: Option<Arc<RetrievalEngine>>,
    pub fallback: Option<Arc<dyn FallbackCorpus>>,
    pub prompt_builder: Arc<PromptBuilder>,
    pub client: Arc<CompletionClient>,
    pub results: mpsc::Sender<CompletionResult>,
    pub worker_permits: Arc<Semaphore>,
    /// Notified with a request's id the moment it is launched, before any
    /// async work starts - this is what lets a host seed its ghost-text
    /// state machine's `Idle -> Requesting(rid)` transition (spec §4.7)
    /// with the right id ahead of the eventual `Result` on `results`.
    pub launches: mpsc::Sender<RequestId>,
}

/// Runs the context-extraction, retrieval, prompt-building and model-call
/// chain for one trigger and delivers the result over `pipeline.results`.
/// A document that vanished (or moved past the launch revision) between
/// trigger and launch silently produces no result - there is nothing left
/// to discard it against.
pub async fn run_pipeline(
    pipeline: Arc<Pipeline>,
    request_id: RequestId,
    document_id: DocumentId,
    launch_revision: Revision,
    prompt_mode: PromptMode,
    config: LaunchConfig,
    cancel: CancelRx,
) {
    let Some(snapshot) = pipeline.documents.snapshot(document_id) else {
        return;
    };
    if snapshot.revision != launch_revision {
        return;
    }

    let window = extract_window(&snapshot.text, snapshot.cursor, prompt_mode);
    let (retrieval_cancel, completion_cancel) = fan_out_cancel(cancel);

    let mut rag_context = Vec::new();
    if config.rag_enabled {
        if let Some(engine) = &pipeline.retrieval {
            let query: String = window.text.chars().take(prompt_mode.retrieval_query_cap()).collect();
            let fallback_documents = pipeline.fallback.as_ref().map(|f| f.documents()).unwrap_or_default();
            let retrieved = engine
                .retrieve(
                    &query,
                    prompt_mode.retrieval_query_cap(),
                    prompt_mode.retrieval_top_k(),
                    config.retrieval_budget_ms,
                    config.min_similarity,
                    &fallback_documents,
                    retrieval_cancel,
                )
                .await;
            if let Ok(retrieved) = retrieved {
                rag_context = retrieved
                    .items
                    .into_iter()
                    .map(|(doc_id, _chunk_idx, text, _score)| RagChunk { source: format!("doc-{}", doc_id.raw()), text })
                    .collect();
            }
        }
    }

    let built = pipeline.prompt_builder.build(&PromptInputs {
        window: &window,
        mode: prompt_mode,
        rag_context: &rag_context,
        template_id: config.template_id.as_deref(),
        project_meta: config.project_meta.clone(),
    });

    let idempotent = config.temperature <= f32::EPSILON;
    let deadline = Instant::now() + Duration::from_millis(config.provider_timeout_ms);
    let request = CompletionRequest {
        request_id,
        prompt: built.prompt,
        max_tokens: built.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        model: config.model.clone(),
        deadline,
        idempotent,
    };

    let result = pipeline.client.complete(&request, completion_cancel).await;
    let _ = pipeline.results.send(result).await;
}

/// A single launch's cancellation must reach both the retrieval call and
/// the completion call, but a `CancelRx` is a one-shot receiver and can't
/// be cloned. This spawns a tiny forwarding task that waits once on the
/// outer signal and relays it to both inner ones.
fn fan_out_cancel(cancel: CancelRx) -> (CancelRx, CancelRx) {
    let (retrieval_tx, retrieval_rx) = quill_event::cancelation();
    let (completion_tx, completion_rx) = quill_event::cancelation();
    tokio::spawn(async move {
        let _ = cancel.await;
        let _ = retrieval_tx.send(());
        let _ = completion_tx.send(());
    });
    (retrieval_rx, completion_rx)
}
