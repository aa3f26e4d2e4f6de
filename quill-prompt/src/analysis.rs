const POSITIVE_WORDS: &[&str] = &["joy", "laughed", "smiled", "relief", "warmth", "hope", "delighted"];
const NEGATIVE_WORDS: &[&str] = &["fear", "dread", "anger", "grief", "sorrow", "screamed", "trembled"];
const TENSE_WORDS: &[&str] = &["suddenly", "danger", "threat", "urgent", "alarm", "rushed"];
const SCENE_TRANSITION_CUES: &[&str] = &["suddenly", "moments later", "meanwhile", "later that", "the next morning", "hours passed"];

/// A compact, cheap-to-compute set of hints the template's
/// `context_analysis` variable is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAnalysis {
    pub dominant_tone: &'static str,
    pub dialogue_in_progress: bool,
    pub scene_transition: bool,
}

impl ContextAnalysis {
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tone: {}", self.dominant_tone));
        if self.dialogue_in_progress {
            parts.push("dialogue in progress".to_string());
        }
        if self.scene_transition {
            parts.push("scene transition cue present".to_string());
        }
        parts.join("; ")
    }
}

pub fn analyze(window: &str) -> ContextAnalysis {
    let lower = window.to_lowercase();

    let positive = count_occurrences(&lower, POSITIVE_WORDS);
    let negative = count_occurrences(&lower, NEGATIVE_WORDS);
    let tense = count_occurrences(&lower, TENSE_WORDS);

    let dominant_tone = if tense > positive && tense > negative {
        "tense"
    } else if negative > positive {
        "somber"
    } else if positive > 0 {
        "light"
    } else {
        "neutral"
    };

    let dialogue_in_progress = has_unmatched_quote(window);
    let scene_transition = SCENE_TRANSITION_CUES.iter().any(|cue| lower.contains(cue));

    ContextAnalysis { dominant_tone, dialogue_in_progress, scene_transition }
}

fn count_occurrences(haystack: &str, words: &[&str]) -> usize {
    words.iter().map(|w| haystack.matches(w).count()).sum()
}

fn has_unmatched_quote(text: &str) -> bool {
    let straight = text.chars().filter(|&c| c == '"').count();
    let curly_open = text.chars().filter(|&c| c == '\u{201c}').count();
    let curly_close = text.chars().filter(|&c| c == '\u{201d}').count();
    straight % 2 == 1 || curly_open > curly_close
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_tense_tone() {
        let analysis = analyze("Suddenly the alarm rang and danger filled the room.");
        assert_eq!(analysis.dominant_tone, "tense");
    }

    #[test]
    fn detects_dialogue_in_progress() {
        let analysis = analyze("\"Where is she");
        assert!(analysis.dialogue_in_progress);
    }

    #[test]
    fn detects_scene_transition_cue() {
        let analysis = analyze("Meanwhile, across town, the storm gathered.");
        assert!(analysis.scene_transition);
    }

    #[test]
    fn neutral_tone_with_no_lexicon_hits() {
        let analysis = analyze("The table was made of oak.");
        assert_eq!(analysis.dominant_tone, "neutral");
        assert!(!analysis.scene_transition);
    }
}
