//! Title normalization and trigram similarity (pure text, no DB).

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Filler words that don't distinguish one task from another.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "to", "for", "of", "in", "on", "at", "with", "and", "or", "my", "me",
    "this", "that", "some",
];

const DAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Canonical form of a task title: NFKC, lowercase, punctuation stripped,
/// stopwords dropped, whitespace collapsed. May come back empty.
pub fn normalize_title(raw: &str) -> String {
    let folded: String = raw.nfkc().collect::<String>().to_lowercase();
    let cleaned: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A day name mentioned literally in the title, as 0=Sunday..6=Saturday.
/// Matches whole words only, so "monitor" never reads as Monday.
pub fn day_mentioned_in_title(raw: &str) -> Option<u8> {
    let folded: String = raw.nfkc().collect::<String>().to_lowercase();
    for word in folded.split(|c: char| !c.is_alphanumeric()) {
        if let Some(idx) = DAY_NAMES.iter().position(|d| *d == word) {
            return Some(idx as u8);
        }
    }
    None
}

/// Character trigrams of a normalized title. Strings shorter than three
/// characters contribute themselves as a single gram.
pub fn trigrams(s: &str) -> HashSet<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return HashSet::new();
    }
    if chars.len() < 3 {
        return HashSet::from([s.to_string()]);
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Jaccard overlap of the two titles' trigram sets, in [0,1].
pub fn trigram_jaccard(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_title("Buy milk!"), "buy milk");
        assert_eq!(normalize_title("  BUY   Milk  "), "buy milk");
    }

    #[test]
    fn test_normalize_drops_stopwords() {
        assert_eq!(normalize_title("Go to the gym"), "go gym");
        assert_eq!(normalize_title("Pick up a package for my mom"), "pick up package mom");
    }

    #[test]
    fn test_normalize_can_come_back_empty() {
        assert_eq!(normalize_title("the"), "");
        assert_eq!(normalize_title("!!!"), "");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn test_normalize_applies_nfkc() {
        // Fullwidth letters fold to ASCII
        assert_eq!(normalize_title("Ｂｕｙ ｍｉｌｋ"), "buy milk");
    }

    #[test]
    fn test_day_mentioned_whole_word_only() {
        assert_eq!(day_mentioned_in_title("Call plumber Monday"), Some(1));
        assert_eq!(day_mentioned_in_title("friday review"), Some(5));
        assert_eq!(day_mentioned_in_title("Check the monitor"), None);
        assert_eq!(day_mentioned_in_title("sundaes for dessert"), None);
        assert_eq!(day_mentioned_in_title("water plants"), None);
    }

    #[test]
    fn test_identical_titles_are_fully_similar() {
        assert_eq!(trigram_jaccard("buy milk", "buy milk"), 1.0);
    }

    #[test]
    fn test_near_duplicates_clear_merge_threshold() {
        // "buy milks" vs "buy milk": grams differ by one
        let sim = trigram_jaccard("buy milk oat", "buy milk oats");
        assert!(sim >= 0.9, "near-duplicate should clear 0.9, got {}", sim);
    }

    #[test]
    fn test_different_titles_stay_below_threshold() {
        let sim = trigram_jaccard("buy milk", "buy eggs");
        assert!(sim < 0.9, "distinct tasks must not merge, got {}", sim);
        let sim = trigram_jaccard("water plants", "call dentist");
        assert!(sim < 0.1);
    }

    #[test]
    fn test_short_strings_compare_as_whole_grams() {
        assert_eq!(trigram_jaccard("ab", "ab"), 1.0);
        assert!(trigram_jaccard("ab", "cd") < 0.9);
        assert_eq!(trigram_jaccard("", "buy milk"), 0.0);
    }
}
