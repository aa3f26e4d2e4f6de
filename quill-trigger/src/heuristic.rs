/// How strongly the text immediately before the cursor favors launching a
/// completion. `MidWord` is the only variant that drops the trigger
/// outright; the rest just influence how long the caller debounces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    Strong,
    MidWord,
    Accept,
    Neutral,
}

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '\u{3002}', '\u{ff01}', '\u{ff1f}', '\u{2026}'];
const PAUSE_MARKERS: &[char] = &[',', ';', ':', '\u{3001}', '，', '；'];
const CONJUNCTIONS: &[&str] = &[
    "and", "but", "or", "so", "because", "while", "since", "although",
    "而且", "但是", "所以", "因为", "不过", "然而", "于是",
];

/// Classifies the trigger opportunity from the text immediately before the
/// cursor. Only ever looks backward - there is no "after the cursor" text
/// yet when a character was just typed.
///
/// `punctuation_assist` gates the pause-marker bullet of the heuristic
/// (spec §4.2 step 5, "space after a pause marker ... accept") - when
/// disabled, a pause marker no longer earns the `Accept` bump on its own;
/// conjunction words still do, since those are a distinct rule keyed on the
/// word rather than on punctuation.
pub fn classify(text_before_cursor: &str, punctuation_assist: bool) -> Heuristic {
    let mut chars = text_before_cursor.chars().rev();
    let Some(last) = chars.next() else {
        return Heuristic::Neutral;
    };

    if last == '\n' || SENTENCE_TERMINATORS.contains(&last) {
        return Heuristic::Strong;
    }

    if last.is_whitespace() {
        let Some(prev) = chars.next() else {
            return Heuristic::Neutral;
        };
        if punctuation_assist && PAUSE_MARKERS.contains(&prev) {
            return Heuristic::Accept;
        }
        if prev.is_alphanumeric() && word_before_is_conjunction(text_before_cursor) {
            return Heuristic::Accept;
        }
        if prev.is_alphanumeric() {
            return Heuristic::MidWord;
        }
        return Heuristic::Neutral;
    }

    Heuristic::Neutral
}

fn word_before_is_conjunction(text_before_cursor: &str) -> bool {
    let trimmed = text_before_cursor.trim_end();
    let word = trimmed.rsplit(|c: char| c.is_whitespace() || c.is_ascii_punctuation()).next().unwrap_or("");
    CONJUNCTIONS.iter().any(|c| c.eq_ignore_ascii_case(word))
}
