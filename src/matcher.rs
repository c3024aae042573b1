//! Candidate selection: score every option on a results page against the
//! target address and decide which one (if any) to follow.
//!
//! Decision order:
//! 1. any candidate scoring at least [`HIGH_CONFIDENCE_THRESHOLD`] → best of those
//! 2. otherwise the best candidate, if it scores above [`BEST_EFFORT_THRESHOLD`]
//! 3. otherwise the first candidate, reported with score 0
//!
//! Step 3 picks an address even when nothing resembles the target. Callers
//! that must not download a wrong certificate should reject
//! [`MatchBasis::Fallback`].

use std::fmt;

use serde::Serialize;

use crate::scoring::score;

pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const BEST_EFFORT_THRESHOLD: f64 = 0.3;

/// Link text the portal shows next to the results. Not an address.
pub const DECOY_PHRASE: &str = "get a new energy certificate";

/// One selectable option on a results page. `handle` is carried through
/// untouched for the caller to act on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate<H = String> {
    pub text: String,
    pub handle: H,
}

impl<H> MatchCandidate<H> {
    pub fn new(text: impl Into<String>, handle: H) -> Self {
        Self {
            text: text.into(),
            handle,
        }
    }

    /// Empty entries and navigation links are not addresses
    pub fn is_decoy(&self) -> bool {
        let text = self.text.trim();
        text.is_empty() || text.to_lowercase().contains(DECOY_PHRASE)
    }
}

/// Why a candidate was (or was not) selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    HighConfidence,
    BestEffort,
    Fallback,
    NoCandidates,
}

impl MatchBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchBasis::HighConfidence => "high_confidence",
            MatchBasis::BestEffort => "best_effort",
            MatchBasis::Fallback => "fallback",
            MatchBasis::NoCandidates => "no_candidates",
        }
    }
}

impl fmt::Display for MatchBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of matching one target against a results page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchDecision<H = String> {
    pub selected: Option<MatchCandidate<H>>,
    pub score: f64,
    pub basis: MatchBasis,
}

impl<H> MatchDecision<H> {
    fn none() -> Self {
        Self {
            selected: None,
            score: 0.0,
            basis: MatchBasis::NoCandidates,
        }
    }
}

/// Choose the candidate that best matches `target`
pub fn select<H: Clone>(target: &str, candidates: &[MatchCandidate<H>]) -> MatchDecision<H> {
    let scored: Vec<(&MatchCandidate<H>, f64)> = candidates
        .iter()
        .filter(|c| !c.is_decoy())
        .map(|c| (c, score(target, &c.text)))
        .collect();

    let Some(&(first, _)) = scored.first() else {
        return MatchDecision::none();
    };

    // Strictly greater keeps the earliest candidate on ties
    let (best, best_score) = scored
        .iter()
        .skip(1)
        .fold(scored[0], |acc, &(c, s)| if s > acc.1 { (c, s) } else { acc });

    if best_score >= HIGH_CONFIDENCE_THRESHOLD {
        return MatchDecision {
            selected: Some(best.clone()),
            score: best_score,
            basis: MatchBasis::HighConfidence,
        };
    }

    if best_score > BEST_EFFORT_THRESHOLD {
        return MatchDecision {
            selected: Some(best.clone()),
            score: best_score,
            basis: MatchBasis::BestEffort,
        };
    }

    MatchDecision {
        selected: Some(first.clone()),
        score: 0.0,
        basis: MatchBasis::Fallback,
    }
}
