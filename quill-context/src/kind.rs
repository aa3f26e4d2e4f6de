use serde::{Deserialize, Serialize};

/// The variant of text being completed, inferred from cursor position and
/// surrounding punctuation rather than tagged by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Text,
    Dialogue,
    Description,
    Heading,
    Character,
    Location,
    Time,
    MetadataTag,
    Paragraph,
}
