//! Completion Client (component C6): issues cancellable blocking or
//! streaming calls to an OpenAI-compatible chat-completions endpoint and
//! tags every result with its originating request id. Does not cache
//! results and does not know about documents, templates, or retrieval -
//! it receives a finished prompt and returns text.

mod client;
mod error;
mod request;
mod result;
mod retry;
mod wire;

pub use client::{ClientConfig, CompletionClient};
pub use error::{ClientError, ClientErrorKind};
pub use request::{CompletionRequest, RequestId};
pub use result::{CompletionResult, CompletionStatus, Usage};
