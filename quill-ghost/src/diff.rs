//! Incremental suffix diff: decides how much of a raw model suggestion is
//! actually new, so the overlay never repeats text already on the screen.

/// Labels a raw completion occasionally opens with, echoing the prompt's
/// own instruction back at the user. Stripped before the diff runs.
const KNOWN_PREFIXES: &[&str] = &["Continuation:", "Completion:", "Continue:"];

/// Prefix-match lengths tried in decreasing order against the tail of the
/// text already before the cursor.
const PREFIX_PROBE_LENGTHS: &[usize] = &[100, 50, 30, 20, 10, 5];

/// How many trailing chars of the pre-cursor text are searched for
/// anywhere inside the suggestion when no prefix match is found.
const ANCHOR_SEARCH_LEN: usize = 20;

/// Cap on a suggestion with no overlap at all.
const NO_OVERLAP_CAP: usize = 200;

/// Computes the text to display for `suggestion` given the document text
/// immediately before the cursor. Returns `None` when there is nothing
/// left to show.
pub fn incremental_diff(buffer_before_cursor: &str, suggestion: &str) -> Option<String> {
    let cleaned = strip_known_prefix(suggestion.trim());
    if cleaned.is_empty() {
        return None;
    }

    let before: Vec<char> = buffer_before_cursor.chars().collect();
    let suggestion_chars: Vec<char> = cleaned.chars().collect();

    for &len in PREFIX_PROBE_LENGTHS {
        if before.len() < len || suggestion_chars.len() < len {
            continue;
        }
        let tail = &before[before.len() - len..];
        let head = &suggestion_chars[..len];
        if tail == head {
            let display: String = suggestion_chars[len..].iter().collect();
            return non_empty(display);
        }
    }

    let anchor_len = ANCHOR_SEARCH_LEN.min(before.len());
    if anchor_len > 0 {
        let anchor: Vec<char> = before[before.len() - anchor_len..].to_vec();
        if let Some(match_end) = find_subsequence_end(&suggestion_chars, &anchor) {
            let display: String = suggestion_chars[match_end..].iter().collect();
            return non_empty(display);
        }
    }

    non_empty(truncate_at_sentence_boundary(cleaned, NO_OVERLAP_CAP))
}

fn strip_known_prefix(text: &str) -> &str {
    for prefix in KNOWN_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            return rest.trim_start();
        }
    }
    text
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Finds `needle` as a contiguous run inside `haystack`, returning the
/// char index just past the first match (i.e. where the unmatched
/// remainder of `haystack` begins).
fn find_subsequence_end(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&start| &haystack[start..start + needle.len()] == needle)
        .map(|start| start + needle.len())
}

/// Truncates `text` to at most `cap` chars, backing up to the nearest
/// preceding sentence terminator and appending an ellipsis if truncation
/// happened mid-sentence.
fn truncate_at_sentence_boundary(text: &str, cap: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= cap {
        return text.to_string();
    }
    let window = &chars[..cap];
    let cut = window
        .iter()
        .rposition(|&c| matches!(c, '.' | '!' | '?' | '\u{3002}' | '\u{ff01}' | '\u{ff1f}'))
        .map(|pos| pos + 1)
        .unwrap_or(cap);
    let mut out: String = window[..cut].iter().collect();
    out.push('\u{2026}');
    out
}
