use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const SENTENCE_BOUNDARY_WINDOW: usize = 100;

/// Splits `text` into chunks of roughly `chunk_size` chars with `overlap`
/// chars repeated between consecutive chunks, preferring to cut at a
/// sentence terminator near the boundary over a hard mid-sentence cut.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end < chars.len() {
            find_sentence_boundary(&chars, hard_end, SENTENCE_BOUNDARY_WINDOW).unwrap_or(hard_end)
        } else {
            hard_end
        };

        chunks.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}

fn find_sentence_boundary(chars: &[char], approx: usize, window: usize) -> Option<usize> {
    let low = approx.saturating_sub(window);
    (low..approx).rev().find(|&i| matches!(chars[i], '.' | '!' | '?' | '\u{3002}')).map(|i| i + 1)
}

/// Halves `text` (by char count) and extends to the nearest preceding
/// sentence boundary, for retrying an embedding call that was rejected as
/// too large.
pub fn truncate_for_retry(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    let half = (chars.len() / 2).max(1);
    let end = find_sentence_boundary(&chars, half, SENTENCE_BOUNDARY_WINDOW).unwrap_or(half);
    chars[..end].iter().collect()
}

pub fn content_hash(text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
