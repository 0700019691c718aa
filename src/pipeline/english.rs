// src/pipeline/english.rs

//! English-language README heuristic.

use std::sync::OnceLock;

use regex::Regex;

/// READMEs shorter than this are rejected outright.
const MIN_README_CHARS: usize = 50;
/// Only the leading slice of the README is scanned.
const SCAN_WINDOW_CHARS: usize = 1000;
/// Distinct indicator words required for acceptance.
const MIN_DISTINCT_MATCHES: usize = 3;

/// Common English function words checked as whole-word matches.
const INDICATOR_WORDS: [&str; 10] = [
    "the", "is", "and", "to", "of", "in", "for", "with", "this", "that",
];

fn indicator_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        INDICATOR_WORDS
            .iter()
            .map(|word| Regex::new(&format!(r"\b{word}\b")).expect("static word pattern"))
            .collect()
    })
}

/// Accept a README iff it is long enough and at least three distinct
/// indicator words appear in its first 1000 characters.
pub fn is_english_readme(text: &str) -> bool {
    if text.chars().count() < MIN_README_CHARS {
        return false;
    }

    let window: String = text
        .chars()
        .take(SCAN_WINDOW_CHARS)
        .collect::<String>()
        .to_lowercase();

    let distinct = indicator_patterns()
        .iter()
        .filter(|pattern| pattern.is_match(&window))
        .count();

    distinct >= MIN_DISTINCT_MATCHES
}
