//! Query-side types and the multi-strategy search pipeline

pub mod engine;
pub mod params;
pub mod score;

use std::cmp::Ordering;

use crate::base::Score;

/// Strategy labels reported in [`SearchMetadata`]
pub const STRATEGY_EMPTY_QUERY: &str = "empty_query";
pub const STRATEGY_EXACT_MATCH: &str = "exact_match";

pub struct ScoredPostcode {
    pub postcode: String,
    pub score: Score,
}

impl Clone for ScoredPostcode {
    fn clone(&self) -> Self {
        Self {
            postcode: self.postcode.clone(),
            score: self.score,
        }
    }
}

impl std::fmt::Display for ScoredPostcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.postcode, self.score)
    }
}

impl PartialEq for ScoredPostcode {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.postcode == other.postcode
    }
}

impl Eq for ScoredPostcode {}

impl PartialOrd for ScoredPostcode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredPostcode {
    /// Decreasing score; ties broken by lexical postcode order so rankings
    /// are deterministic
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.postcode.cmp(&other.postcode))
    }
}

/// Diagnostics attached to every search outcome
#[derive(Debug, Clone)]
pub struct SearchMetadata {
    pub search_time_ms: f64,
    pub candidates_evaluated: usize,
    pub strategy: String,
    pub parallel_processing: bool,
    pub cache_hit: bool,
    pub max_distance_used: Option<usize>,
    pub prefix_length_used: Option<usize>,
}

pub struct SearchOutcome {
    pub results: Vec<ScoredPostcode>,
    pub metadata: SearchMetadata,
}
