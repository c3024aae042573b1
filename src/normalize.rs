use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens that carry no address information
pub const STOP_WORDS: [&str; 9] = ["the", "and", "of", "in", "at", "to", "for", "with", "by"];

// Unit numbers are picked up by feature extraction, so the words are dropped
static UNIT_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:flat|apartment|apt|unit)\b").expect("Invalid unit word regex")
});

static PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[,.\-()]").expect("Invalid punctuation regex")
});

// Pre-compiled regex for whitespace normalization (compile once, use many times)
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex pattern")
});

/// An address reduced to comparable lowercase tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedAddress {
    tokens: Vec<String>,
}

impl NormalizedAddress {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Distinct tokens, for overlap scoring
    pub fn token_set(&self) -> HashSet<&str> {
        self.tokens.iter().map(String::as_str).collect()
    }

    /// Tokens joined with single spaces
    pub fn join(&self) -> String {
        self.tokens.join(" ")
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}

/// Normalize a raw address into its token form
pub fn normalize(raw: &str) -> NormalizedAddress {
    let lowered = raw.to_lowercase();
    let without_units = UNIT_WORD_RE.replace_all(&lowered, " ");
    let spaced = PUNCTUATION_RE.replace_all(&without_units, " ");
    let collapsed = WHITESPACE_RE.replace_all(&spaced, " ");

    let tokens = collapsed
        .trim()
        .split(' ')
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(String::from)
        .collect();

    NormalizedAddress { tokens }
}
