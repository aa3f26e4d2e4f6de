use quill_context::{CompletionKind, PromptMode};

/// Kind-dependent instruction fragment substituted into
/// `type_specific_guidance`. Mode only affects verbosity, not substance, so
/// it is handled by a single multiplier rather than a full 9x3 table.
pub fn type_specific_guidance(kind: CompletionKind, mode: PromptMode) -> String {
    let base = match kind {
        CompletionKind::Text => "Continue the prose in the author's established voice.",
        CompletionKind::Dialogue => "Continue the spoken line; keep quotation marks balanced and voice consistent with the speaker.",
        CompletionKind::Description => "Continue the descriptive passage with concrete sensory detail.",
        CompletionKind::Heading => "Suggest a short, evocative chapter or section title.",
        CompletionKind::Character => "Suggest a character name consistent with the story's setting.",
        CompletionKind::Location => "Suggest a place name consistent with the story's setting.",
        CompletionKind::Time => "Suggest a time or date reference consistent with the story's timeline.",
        CompletionKind::MetadataTag => "Complete the metadata tag concisely, without narrative prose.",
        CompletionKind::Paragraph => "Begin a new paragraph that follows naturally from what precedes it.",
    };

    match mode {
        PromptMode::Fast => base.to_string(),
        PromptMode::Balanced => format!("{base} Favor a moderate amount of detail."),
        PromptMode::Full => format!("{base} Favor rich, well-developed detail and continuity with established characters and locations."),
    }
}

/// Static `(kind, mode)` output-length table (in the character-proxy unit
/// used throughout this crate).
pub fn max_output_tokens(kind: CompletionKind, mode: PromptMode) -> u32 {
    let base = match kind {
        CompletionKind::MetadataTag | CompletionKind::Heading | CompletionKind::Time | CompletionKind::Location | CompletionKind::Character => 24,
        CompletionKind::Dialogue => 96,
        CompletionKind::Paragraph => 160,
        CompletionKind::Description | CompletionKind::Text => 128,
    };

    match mode {
        PromptMode::Fast => base,
        PromptMode::Balanced => base * 2,
        PromptMode::Full => base * 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mode_yields_longer_output_than_fast() {
        assert!(max_output_tokens(CompletionKind::Text, PromptMode::Full) > max_output_tokens(CompletionKind::Text, PromptMode::Fast));
    }

    #[test]
    fn metadata_tag_is_short_in_every_mode() {
        for mode in [PromptMode::Fast, PromptMode::Balanced, PromptMode::Full] {
            assert!(max_output_tokens(CompletionKind::MetadataTag, mode) <= 96);
        }
    }
}
