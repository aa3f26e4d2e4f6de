use std::collections::HashSet;

use crate::DocumentId;

const WORD_SAMPLE_CHARS: usize = 1_000;

/// A document snapshot as seen by the lexical fallback: just enough to
/// compute word overlap, nothing the vector path needs.
pub struct LexicalDocument {
    pub document_id: DocumentId,
    pub text: String,
}

fn word_set(text: &str) -> HashSet<String> {
    text.chars()
        .take(WORD_SAMPLE_CHARS)
        .collect::<String>()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f32 / union as f32
}

/// Scores each candidate document against `query` by Jaccard similarity of
/// their (lowercased, first-1000-char) word sets, returning the top `top_k`
/// above `min_overlap`.
pub fn lexical_search(
    query: &str,
    documents: &[LexicalDocument],
    top_k: usize,
    min_overlap: f32,
) -> Vec<(DocumentId, f32)> {
    let query_words = word_set(query);
    let mut scored: Vec<(DocumentId, f32)> = documents
        .iter()
        .map(|doc| (doc.document_id, jaccard(&query_words, &word_set(&doc.text))))
        .filter(|(_, score)| *score >= min_overlap)
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);
    scored
}
