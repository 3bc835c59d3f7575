//! Search orchestrator: owns the indices and runs the multi-strategy
//! query pipeline
//!
//! All index state is read-only once the engine is built, so concurrent
//! `search` calls need no locking; the only mutable state is a pair of
//! atomic counters.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use derivative::Derivative;
use log::{debug, warn};
use rayon::prelude::*;

use crate::base::normalize;
use crate::builder::BuildError;
use crate::index::bktree::BkTree;
use crate::index::exact::ExactIndex;
use crate::index::trie::Trie;

use super::params;
use super::score::score_batch;
use super::{
    ScoredPostcode, SearchMetadata, SearchOutcome, STRATEGY_EMPTY_QUERY, STRATEGY_EXACT_MATCH,
};

/// Upper bound on the scoring pool size
pub const MAX_POOL_THREADS: usize = 8;

/// Minimum candidates per parallel scoring batch
const MIN_BATCH_SIZE: usize = 50;

#[derive(Derivative, Clone, Copy)]
#[derivative(Default)]
pub struct SearchOptions {
    /// Number of results to return
    #[derivative(Default(value = "20"))]
    pub top_n: usize,

    /// Best-effort bound on the candidate set handed to the scorer
    #[derivative(Default(value = "1000"))]
    pub max_candidates: usize,

    /// Derive the BK-tree radius from the query length; when false, a
    /// fixed radius of 2 is used
    #[derivative(Default(value = "true"))]
    pub use_dynamic_distance: bool,

    /// Apply the prefix-match score bonus
    #[derivative(Default(value = "true"))]
    pub use_weighted_scoring: bool,

    /// Candidate count at which scoring moves onto the worker pool
    #[derivative(Default(value = "500"))]
    pub parallel_threshold: usize,
}

/// Runtime counters, readable at any time
pub struct EngineStats {
    pub total_postcodes: usize,
    pub total_searches: u64,
    pub cache_hits: u64,
    pub num_threads: usize,
}

pub struct Engine {
    pub(crate) exact: ExactIndex,
    pub(crate) bk_tree: BkTree,
    pub(crate) trie: Trie,
    pub(crate) postcodes: Vec<String>,
    pool: rayon::ThreadPool,
    num_threads: usize,
    search_count: AtomicU64,
    cache_hits: AtomicU64,
}

/// Built index structures, handed over by the builder or the cache loader
pub(crate) struct EngineParts {
    pub exact: ExactIndex,
    pub bk_tree: BkTree,
    pub trie: Trie,
    pub postcodes: Vec<String>,
}

impl Engine {
    /// Assembles an engine from built structures; the scoring pool is
    /// created here and lives until the engine is dropped.
    pub(crate) fn from_parts(parts: EngineParts) -> Result<Self, BuildError> {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_POOL_THREADS);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;

        debug!(
            "Engine ready: {} postcodes, {} scoring threads",
            parts.postcodes.len(),
            num_threads
        );

        Ok(Self {
            exact: parts.exact,
            bk_tree: parts.bk_tree,
            trie: parts.trie,
            postcodes: parts.postcodes,
            pool,
            num_threads,
            search_count: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        })
    }

    /// Number of postcodes loaded at build time
    pub fn len(&self) -> usize {
        self.postcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postcodes.is_empty()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            total_postcodes: self.postcodes.len(),
            total_searches: self.search_count.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            num_threads: self.num_threads,
        }
    }

    /// Releases the engine and its worker pool. Dropping the engine has
    /// the same effect; this only makes the teardown point explicit.
    pub fn shutdown(self) {
        debug!("Shutting down search engine");
    }

    /// Runs the ranked fuzzy search. Never fails: degraded outcomes
    /// (empty query, dropped scoring batch) are reported through the
    /// metadata instead.
    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchOutcome {
        let start = Instant::now();
        self.search_count.fetch_add(1, Ordering::Relaxed);

        if query.trim().is_empty() {
            return SearchOutcome {
                results: Vec::new(),
                metadata: SearchMetadata {
                    search_time_ms: 0.0,
                    candidates_evaluated: 0,
                    strategy: STRATEGY_EMPTY_QUERY.to_string(),
                    parallel_processing: false,
                    cache_hit: false,
                    max_distance_used: None,
                    prefix_length_used: None,
                },
            };
        }

        let normalized = normalize(query);

        // Strategy 1: exact match short-circuits the pipeline
        if let Some(variants) = self.exact.lookup(&normalized) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            let mut results: Vec<ScoredPostcode> = variants
                .iter()
                .map(|postcode| ScoredPostcode {
                    postcode: postcode.clone(),
                    score: 100.0,
                })
                .collect();
            let evaluated = results.len();
            results.truncate(options.top_n);

            return SearchOutcome {
                results,
                metadata: SearchMetadata {
                    search_time_ms: start.elapsed().as_secs_f64() * 1e3,
                    candidates_evaluated: evaluated,
                    strategy: STRATEGY_EXACT_MATCH.to_string(),
                    parallel_processing: false,
                    cache_hit: true,
                    max_distance_used: None,
                    prefix_length_used: None,
                },
            };
        }

        let max_distance = if options.use_dynamic_distance {
            params::max_distance_for(normalized.len())
        } else {
            params::FIXED_MAX_DISTANCE
        };
        let prefix_length = params::prefix_length_for(normalized.len());

        let candidates =
            self.gather_candidates(&normalized, max_distance, prefix_length, options.max_candidates);
        debug!(
            "Query {:?}: {} candidates (distance={}, prefix={})",
            normalized,
            candidates.len(),
            max_distance,
            prefix_length
        );

        let use_parallel = candidates.len() >= options.parallel_threshold;
        let mut scored = if use_parallel {
            self.score_parallel(&candidates, &normalized, options.use_weighted_scoring)
        } else {
            score_batch(&candidates, &normalized, options.use_weighted_scoring)
        };

        scored.sort();
        scored.truncate(options.top_n);

        SearchOutcome {
            results: scored,
            metadata: SearchMetadata {
                search_time_ms: start.elapsed().as_secs_f64() * 1e3,
                candidates_evaluated: candidates.len(),
                strategy: format!(
                    "fuzzy (distance={}, prefix={})",
                    max_distance, prefix_length
                ),
                parallel_processing: use_parallel,
                cache_hit: false,
                max_distance_used: Some(max_distance),
                prefix_length_used: Some(prefix_length),
            },
        }
    }

    /// Strategies 2 and 3: union of the trie prefix filter and the
    /// BK-tree radius search, deduplicated in first-seen order and
    /// truncated at `max_candidates`.
    fn gather_candidates(
        &self,
        normalized: &str,
        max_distance: usize,
        prefix_length: usize,
        max_candidates: usize,
    ) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if prefix_length > 0 && normalized.len() >= prefix_length {
            let prefix = &normalized[..prefix_length];
            for postcode in self.trie.search_prefix(prefix, max_candidates) {
                if seen.insert(postcode.clone()) {
                    candidates.push(postcode);
                }
            }
        }

        'radius: for (word, _distance) in self.bk_tree.search(normalized, max_distance) {
            if let Some(variants) = self.exact.lookup(&word) {
                for postcode in variants {
                    if seen.insert(postcode.clone()) {
                        candidates.push(postcode.clone());
                        if candidates.len() >= max_candidates {
                            break 'radius;
                        }
                    }
                }
            }
        }

        candidates
    }

    /// Partitions the candidates across the worker pool. A panicking batch
    /// is dropped from the ranking; the search itself still succeeds.
    fn score_parallel(
        &self,
        candidates: &[String],
        normalized: &str,
        weighted: bool,
    ) -> Vec<ScoredPostcode> {
        let batch_size = (candidates.len() / self.num_threads).max(MIN_BATCH_SIZE);

        self.pool.install(|| {
            candidates
                .par_chunks(batch_size)
                .flat_map_iter(|batch| {
                    match catch_unwind(AssertUnwindSafe(|| score_batch(batch, normalized, weighted)))
                    {
                        Ok(scored) => scored,
                        Err(_) => {
                            warn!(
                                "Scoring batch of {} candidates failed; dropping it from the ranking",
                                batch.len()
                            );
                            Vec::new()
                        }
                    }
                })
                .collect()
        })
    }
}
