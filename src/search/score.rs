//! Candidate scoring
//!
//! The sequential and parallel paths both go through [`score_batch`], so a
//! ranking never depends on which path executed.

use crate::base::{normalize, Score};
use crate::distance::similarity;

use super::ScoredPostcode;

/// Multiplier applied when a candidate shares the query's leading
/// characters; favors geographically plausible matches over globally
/// closer but irrelevant strings.
pub const PREFIX_BONUS: Score = 1.15;

/// Number of leading query characters the bonus compares
pub const PREFIX_BONUS_LEN: usize = 3;

/// Candidate that makes the scorer panic in test builds, so the engine's
/// batch-drop recovery can be exercised
#[cfg(test)]
pub(crate) const FAILING_CANDIDATE: &str = "##FAIL##";

/// Scores one candidate against a normalized query, in `[0, 100]`.
pub fn score_candidate(candidate: &str, normalized_query: &str, weighted: bool) -> Score {
    #[cfg(test)]
    if candidate == FAILING_CANDIDATE {
        panic!("scoring failure injected for {}", candidate);
    }

    let normalized_candidate = normalize(candidate);
    let mut score = similarity(normalized_query, &normalized_candidate);

    if weighted {
        let prefix = &normalized_query[..normalized_query.len().min(PREFIX_BONUS_LEN)];
        if normalized_candidate.starts_with(prefix) {
            score = (score * PREFIX_BONUS).min(100.0);
        }
    }

    score
}

/// Scores a batch of candidates. Pure function of its arguments.
pub fn score_batch(batch: &[String], normalized_query: &str, weighted: bool) -> Vec<ScoredPostcode> {
    batch
        .iter()
        .map(|candidate| ScoredPostcode {
            postcode: candidate.clone(),
            score: score_candidate(candidate, normalized_query, weighted),
        })
        .collect()
}
