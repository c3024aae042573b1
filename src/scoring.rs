//! Confidence scoring of a candidate address against a target address.
//!
//! Score formula (additive, clamped to [0, 1]):
//!
//! ```text
//! number term    +0.4 same number, -0.3 different number, -0.1 only one side has one
//! building term  +0.4 if one building name contains the other,
//!                else 0.2 * |shared building tokens| / max(building token counts)
//! token term     0.2 * |shared tokens| / |target tokens|
//! substring      +0.1 if the target building name appears in the candidate text
//! ```
//!
//! The token term divides by the target's token count only: the score answers
//! "how much of the target is recoverable from this candidate", so it is not
//! symmetric in its arguments.
//!
//! The weights were tuned by hand against real portal listings. Changing any
//! of them changes which certificate gets downloaded.

use std::collections::HashSet;

use serde::Serialize;

use crate::features::AddressFeatures;
use crate::normalize::normalize;

pub const NUMBER_MATCH_BONUS: f64 = 0.4;
pub const NUMBER_MISMATCH_PENALTY: f64 = 0.3;
pub const NUMBER_MISSING_PENALTY: f64 = 0.1;
pub const BUILDING_CONTAINS_BONUS: f64 = 0.4;
pub const BUILDING_OVERLAP_WEIGHT: f64 = 0.2;
pub const TOKEN_OVERLAP_WEIGHT: f64 = 0.2;
pub const BUILDING_SUBSTRING_BONUS: f64 = 0.1;

/// Per-term contributions behind a score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub number: f64,
    pub building: f64,
    pub tokens: f64,
    pub substring: f64,
}

impl ScoreBreakdown {
    /// Sum of the terms, clamped to [0, 1]
    pub fn total(&self) -> f64 {
        (self.number + self.building + self.tokens + self.substring).clamp(0.0, 1.0)
    }
}

/// Score how well `candidate` matches `target`, in [0, 1]
pub fn score(target: &str, candidate: &str) -> f64 {
    score_breakdown(target, candidate).total()
}

/// Score with each term reported separately
pub fn score_breakdown(target: &str, candidate: &str) -> ScoreBreakdown {
    let target_features = AddressFeatures::extract(target);
    let candidate_features = AddressFeatures::extract(candidate);

    let target_tokens = normalize(target);
    let candidate_tokens = normalize(candidate);

    ScoreBreakdown {
        number: number_term(
            target_features.number.as_deref(),
            candidate_features.number.as_deref(),
        ),
        building: building_term(&target_features.building, &candidate_features.building),
        tokens: overlap_ratio(&target_tokens.token_set(), &candidate_tokens.token_set())
            * TOKEN_OVERLAP_WEIGHT,
        substring: substring_term(&target_features.building, candidate),
    }
}

fn number_term(target: Option<&str>, candidate: Option<&str>) -> f64 {
    match (target, candidate) {
        (Some(t), Some(c)) if t == c => NUMBER_MATCH_BONUS,
        (Some(_), Some(_)) => -NUMBER_MISMATCH_PENALTY,
        (Some(_), None) | (None, Some(_)) => -NUMBER_MISSING_PENALTY,
        (None, None) => 0.0,
    }
}

fn building_term(target: &str, candidate: &str) -> f64 {
    if target.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    if target.contains(candidate) || candidate.contains(target) {
        return BUILDING_CONTAINS_BONUS;
    }

    let target_tokens: HashSet<&str> = target.split_whitespace().collect();
    let candidate_tokens: HashSet<&str> = candidate.split_whitespace().collect();
    let shared = target_tokens.intersection(&candidate_tokens).count();
    if shared == 0 {
        return 0.0;
    }

    let denominator = target_tokens.len().max(candidate_tokens.len());
    BUILDING_OVERLAP_WEIGHT * shared as f64 / denominator as f64
}

/// Fraction of target tokens present in the candidate
fn overlap_ratio(target: &HashSet<&str>, candidate: &HashSet<&str>) -> f64 {
    if target.is_empty() {
        return 0.0;
    }
    target.intersection(candidate).count() as f64 / target.len() as f64
}

fn substring_term(target_building: &str, candidate: &str) -> f64 {
    if !target_building.is_empty() && candidate.to_lowercase().contains(target_building) {
        BUILDING_SUBSTRING_BONUS
    } else {
        0.0
    }
}
