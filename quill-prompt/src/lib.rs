//! Prompt Builder (component C5): resolves a template from the registry,
//! substitutes the buffer window, retrieval context and style directives
//! into it, and enforces a hard character-proxy budget on the result.

mod analysis;
mod builder;
mod error;
mod guidance;
mod registry;
mod template;

pub use analysis::{analyze, ContextAnalysis};
pub use builder::{BuiltPrompt, ProjectMeta, PromptBuilder, PromptInputs, RagChunk};
pub use error::PromptError;
pub use guidance::{max_output_tokens, type_specific_guidance};
pub use registry::TemplateRegistry;
pub use template::{AllKinds, KindFilter, Template, TemplateFile};
