//! Suggestion formatter: normalizes paragraph breaks, decides whether a
//! suggestion should open on a new paragraph, and keeps dialogue quotation
//! marks balanced across the cut between buffer and suggestion. Pure and
//! synchronous - it runs on the raw completion result before the
//! incremental diff decides how much of it is actually new.

/// Cue words that mark a scene transition, bilingual since the host prose
/// may be English or Chinese.
const SCENE_TRANSITION_CUES: &[&str] = &[
    "suddenly", "meanwhile", "moments later", "later that", "the next morning", "hours passed",
    "突然", "忽然", "这时", "此时", "接着", "然后", "于是", "片刻后", "不久", "随后", "紧接着",
];

/// Collapses runs of internal whitespace to single spaces and trims the
/// suggestion, then - if the cleaned text opens with a scene-transition
/// cue and the cursor isn't mid-dialogue - prefixes a paragraph break so
/// the transition reads as a fresh paragraph rather than a run-on
/// sentence.
pub fn format_suggestion(raw: &str, context_before: &str) -> String {
    let collapsed = collapse_whitespace(raw.trim());
    if collapsed.is_empty() {
        return collapsed;
    }

    let balanced = balance_dialogue_quotes(&collapsed, context_before);

    if !in_dialogue(context_before) && opens_with_scene_transition(&balanced) && !context_ends_blank(context_before) {
        format!("\n\n{balanced}")
    } else {
        balanced
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

fn opens_with_scene_transition(text: &str) -> bool {
    let lower = text.to_lowercase();
    SCENE_TRANSITION_CUES.iter().any(|cue| lower.starts_with(&cue.to_lowercase()))
}

fn context_ends_blank(context_before: &str) -> bool {
    context_before.is_empty() || context_before.ends_with("\n\n") || context_before.trim_end_matches(' ').ends_with('\n')
}

/// True when `context_before`'s current paragraph has an odd number of
/// quote characters - an opened-but-unclosed dialogue line.
fn in_dialogue(context_before: &str) -> bool {
    let paragraph = context_before.rsplit("\n\n").next().unwrap_or(context_before);
    quote_parity_unbalanced(paragraph)
}

fn quote_parity_unbalanced(text: &str) -> bool {
    let straight = text.chars().filter(|&c| c == '"').count();
    let curly_open = text.chars().filter(|&c| c == '\u{201c}').count();
    let curly_close = text.chars().filter(|&c| c == '\u{201d}').count();
    straight % 2 == 1 || curly_open > curly_close
}

/// If the buffer has an unmatched open quote and the suggestion never
/// closes it, append a closing quote so dialogue doesn't stay open across
/// the accepted text. Leaves already-balanced suggestions untouched.
fn balance_dialogue_quotes(suggestion: &str, context_before: &str) -> String {
    if !in_dialogue(context_before) {
        return suggestion.to_string();
    }
    let combined_unbalanced = quote_parity_unbalanced(&format!("{context_before}{suggestion}"));
    if combined_unbalanced {
        format!("{suggestion}\u{201d}")
    } else {
        suggestion.to_string()
    }
}
