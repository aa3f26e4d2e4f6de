use std::time::Duration;

use quill_context::PromptMode;
use serde::{Deserialize, Serialize};

/// Master switch for how (or whether) triggers turn into requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    AutoAI,
    ManualAI,
    Disabled,
}

/// Everything the trigger gate's policy decisions read. Reloadable at
/// runtime; the gate always reads through an `ArcSwap` so a config reload
/// takes effect on the next event with no restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub mode: CompletionMode,
    pub completion_enabled: bool,
    pub debounce_ms: u64,
    pub throttle_ms: u64,
    pub min_chars: usize,
    pub punctuation_assist: bool,
    pub prompt_mode: PromptMode,
    /// If set, `AutoAI` schedules a fresh trigger ~500ms after an
    /// acceptance so the next completion sees the updated buffer (spec
    /// §4.8 step 4). The gate itself never schedules this - a host's
    /// acceptance coordinator does, via `Surface::accept`.
    pub auto_chain: bool,
}

impl TriggerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            mode: CompletionMode::AutoAI,
            completion_enabled: true,
            debounce_ms: 400,
            throttle_ms: 1_500,
            min_chars: 3,
            punctuation_assist: true,
            prompt_mode: PromptMode::Balanced,
            auto_chain: false,
        }
    }
}
