//! Trigger Gate (component C2): turns `TriggerEvent`s into completion
//! requests under debounce, throttle and content heuristics, owns the
//! single in-flight slot per editor surface, and drives the context
//! extraction, retrieval, prompt-building and model-call chain (C3
//! through C6) once a trigger survives the gate.

mod config;
mod fingerprint;
mod gate;
mod heuristic;
mod launch;

pub use config::{CompletionMode, TriggerConfig};
pub use fingerprint::content_fingerprint;
pub use gate::{GateEvent, TriggerGate};
pub use heuristic::{classify, Heuristic};
pub use launch::{run_pipeline, DocumentSnapshot, DocumentSource, FallbackCorpus, LaunchConfig, Pipeline};

pub use quill_event::AsyncHook;
