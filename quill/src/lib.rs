//! `quill`: the AI completion core for a long-form fiction authoring
//! tool. Assembles the eight components split across this workspace's
//! crates - edit monitoring, the trigger gate, context extraction,
//! retrieval-augmented prompting, the completion client, and the
//! ghost-text state machine and acceptance coordinator - behind one
//! [`CoreContext`], and wires them per editor view through [`Surface`].
//!
//! A host application typically:
//! 1. Builds one [`CoreContext`] at startup (`CoreContext::from_user_config`
//!    or `CoreContext::new` directly).
//! 2. Builds one `quill_doc::EditMonitor`, registering every open document
//!    and routing its own text/cursor events into it.
//! 3. Calls [`CoreContext::build_surface`] once per open editor view,
//!    subscribing each to the monitor.
//! 4. Forwards cursor moves, key presses and its own redraw tick into the
//!    returned [`Surface`], and renders whatever [`quill_ghost::Outcome`]
//!    comes back.

mod config;
mod context;
mod error;
mod logging;
mod surface;

pub use config::{
    config_dir, config_file, templates_dir, vector_store_path, CacheSettings, CompletionSettings, CoreConfig, EmbeddingSettings,
    NetworkSettings, ProviderSettings, RagSettings, RerankSettings,
};
pub use context::CoreContext;
pub use error::CompletionError;
pub use logging::{init as init_logging, LoggingError};
pub use surface::Surface;

pub use quill_client::{ClientError, ClientErrorKind, CompletionResult, CompletionStatus, RequestId, Usage};
pub use quill_context::{CompletionKind, ContextWindow, PromptMode};
pub use quill_doc::{Document, DocumentId, EditMonitor, Revision, TriggerEvent, TriggerKind};
pub use quill_ghost::{DisplayedOverlay, GhostTextState, Key, Outcome, RenderSurface};
pub use quill_prompt::{ProjectMeta, Template, TemplateRegistry};
pub use quill_retrieval::{BatchIndexer, ChunkConfig, IndexProgress, RetrievalError, VectorStore};
pub use quill_trigger::{CompletionMode, DocumentSnapshot, DocumentSource, FallbackCorpus, GateEvent, LaunchConfig, Pipeline, TriggerConfig, TriggerGate};
