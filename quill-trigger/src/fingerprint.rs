use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A fast, non-cryptographic stable hash of the buffer, used only to
/// detect "nothing actually changed since the last launch" - never
/// persisted, never compared across processes.
pub fn content_fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_yields_identical_fingerprint() {
        assert_eq!(content_fingerprint("same text"), content_fingerprint("same text"));
    }

    #[test]
    fn different_text_yields_different_fingerprint() {
        assert_ne!(content_fingerprint("same text"), content_fingerprint("same text."));
    }
}
