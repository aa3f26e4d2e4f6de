use serde::{Deserialize, Serialize};

/// The (Fast, Balanced, Full) axis: independent of [`crate::CompletionKind`]
/// and of the host's `AutoAI`/`ManualAI`/`Disabled` completion mode.
/// Controls context size, retrieval aggressiveness and output length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    Fast,
    Balanced,
    Full,
}

impl PromptMode {
    /// Mode-dependent cap on the bounded text window handed to the extractor.
    pub fn max_window_chars(self) -> usize {
        match self {
            PromptMode::Fast => 3_000,
            PromptMode::Balanced => 6_000,
            PromptMode::Full => 12_000,
        }
    }

    /// Per-mode cap on the retrieval query text built from the window.
    pub fn retrieval_query_cap(self) -> usize {
        match self {
            PromptMode::Fast => 200,
            PromptMode::Balanced => 400,
            PromptMode::Full => 600,
        }
    }

    /// Per-mode top-K for vector search over the retrieval index.
    pub fn retrieval_top_k(self) -> usize {
        match self {
            PromptMode::Fast => 15,
            PromptMode::Balanced => 35,
            PromptMode::Full => 50,
        }
    }

    /// Hard character-proxy cap on the assembled prompt.
    pub fn prompt_char_cap(self) -> usize {
        match self {
            PromptMode::Fast => 2_000,
            PromptMode::Balanced => 8_000,
            PromptMode::Full => 25_000,
        }
    }
}
