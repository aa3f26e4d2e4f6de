use quill_doc::Rope;

use crate::chapters::chapter_bounds;
use crate::kind::CompletionKind;
use crate::mode::PromptMode;

/// A bounded slice of the document around the cursor, ready to hand to the
/// prompt builder. `cursor_offset` is the cursor's position measured in
/// chars from the start of `text`, so callers never need the original
/// document to split it into "before" and "after" halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
    pub cursor_offset: usize,
    pub kind: CompletionKind,
}

/// Preceding text gets roughly twice the budget of following text: a
/// completion continues what came before, it rarely needs much of what's
/// already written after the cursor.
const BEFORE_SHARE: f64 = 0.65;

/// How far past a hard cut point we're willing to look for a blank line or
/// sentence boundary before giving up and cutting mid-sentence.
const BOUNDARY_SEARCH_CHARS: usize = 200;

pub fn extract_window(text: &Rope, cursor: usize, mode: PromptMode) -> ContextWindow {
    let cursor = cursor.min(text.len_chars());
    let cap = mode.max_window_chars();

    let (mut start, mut end) = chapter_bounds(text, cursor).unwrap_or_else(|| {
        let radius = cap / 2;
        (cursor.saturating_sub(radius), (cursor + radius).min(text.len_chars()))
    });

    if end - start > cap {
        let before_budget = ((cursor - start).min((cap as f64 * BEFORE_SHARE) as usize)).max(1);
        let after_budget = cap.saturating_sub(before_budget);

        let desired_start = cursor.saturating_sub(before_budget);
        let desired_end = (cursor + after_budget).min(text.len_chars());

        start = clip_forward_to_boundary(text, desired_start, start, cursor);
        end = clip_backward_to_boundary(text, desired_end, cursor, end);
    }

    let kind = classify(text, cursor);
    let window = text.slice(start..end).to_string();
    ContextWindow {
        text: window,
        start_char: start,
        end_char: end,
        cursor_offset: cursor - start,
        kind,
    }
}

/// Looking forward from `desired`, finds the nearest blank line or
/// sentence-ending boundary within [`BOUNDARY_SEARCH_CHARS`], else returns
/// `desired` unchanged. Never moves past `hard_ceiling`.
fn clip_forward_to_boundary(text: &Rope, desired: usize, floor: usize, hard_ceiling: usize) -> usize {
    let limit = (desired + BOUNDARY_SEARCH_CHARS).min(hard_ceiling);
    for pos in desired..limit {
        if is_boundary_at(text, pos) {
            return pos.max(floor);
        }
    }
    desired.max(floor)
}

/// Looking backward from `desired`, finds the nearest blank line or
/// sentence-ending boundary within [`BOUNDARY_SEARCH_CHARS`], else returns
/// `desired` unchanged. Never moves before `hard_floor`.
fn clip_backward_to_boundary(text: &Rope, desired: usize, hard_floor: usize, ceiling: usize) -> usize {
    let limit = desired.saturating_sub(BOUNDARY_SEARCH_CHARS).max(hard_floor);
    for pos in (limit..desired).rev() {
        if is_boundary_at(text, pos) {
            return pos.min(ceiling);
        }
    }
    desired.min(ceiling)
}

fn is_boundary_at(text: &Rope, pos: usize) -> bool {
    if pos == 0 || pos >= text.len_chars() {
        return true;
    }
    let prev = text.char(pos - 1);
    if prev == '\n' && pos < text.len_chars() && text.char(pos) == '\n' {
        return true;
    }
    matches!(prev, '.' | '!' | '?' | '\u{201d}' | '"') && text.char(pos).is_whitespace()
}

fn classify(text: &Rope, cursor: usize) -> CompletionKind {
    let before = preceding_chars(text, cursor, 2_000);

    if before.ends_with("@char:") {
        return CompletionKind::Character;
    }
    if before.ends_with("@location:") {
        return CompletionKind::Location;
    }
    if before.ends_with("@time:") {
        return CompletionKind::Time;
    }

    let tail_len = before.chars().count().min(20);
    let tail: String = before.chars().rev().take(tail_len).collect::<Vec<_>>().into_iter().rev().collect();
    if tail.contains('@') {
        return CompletionKind::MetadataTag;
    }

    let line_idx = text.char_to_line(cursor);
    let current_line = text.line(line_idx).to_string();
    let current_line_trimmed = current_line.trim_end_matches(['\n', '\r']);

    if current_line_trimmed.trim_start().starts_with('#') {
        return CompletionKind::Heading;
    }

    if current_line_trimmed.trim().is_empty() && line_idx > 0 {
        let prior = text.line(line_idx - 1).to_string();
        if !prior.trim().is_empty() {
            return CompletionKind::Paragraph;
        }
    }

    if has_unmatched_open_quote(&before) {
        return CompletionKind::Dialogue;
    }

    CompletionKind::Text
}

/// Collects up to `limit` chars immediately before `cursor`, stopping early
/// at a blank line since that already marks a paragraph break.
fn preceding_chars(text: &Rope, cursor: usize, limit: usize) -> String {
    let start = cursor.saturating_sub(limit);
    let mut out = String::new();
    let mut blank_run = 0;
    for ch in text.slice(start..cursor).chars() {
        if ch == '\n' {
            blank_run += 1;
            if blank_run >= 2 {
                out.clear();
                continue;
            }
        } else if !ch.is_whitespace() {
            blank_run = 0;
        }
        out.push(ch);
    }
    out
}

/// True if the paragraph so far has an odd number of quote characters,
/// i.e. a quotation that was opened but never closed.
fn has_unmatched_open_quote(paragraph_so_far: &str) -> bool {
    let straight = paragraph_so_far.chars().filter(|&c| c == '"').count();
    let curly_open = paragraph_so_far.chars().filter(|&c| c == '\u{201c}').count();
    let curly_close = paragraph_so_far.chars().filter(|&c| c == '\u{201d}').count();
    straight % 2 == 1 || curly_open > curly_close
}
