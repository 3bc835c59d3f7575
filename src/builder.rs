//! One-time bulk build of the index structures
//!
//! The build is single-threaded and completes before the engine is handed
//! to callers, which is what lets the query path run lock-free.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use thiserror::Error;

use crate::base::normalize;
use crate::index::bktree::BkTree;
use crate::index::exact::ExactIndex;
use crate::index::trie::Trie;
use crate::search::engine::{Engine, EngineParts};

/// Progress is reported once per batch of this size
const BATCH_SIZE: usize = 10_000;

#[derive(Error, Debug)]
pub enum BuildError {
    /// The bulk source failed mid-stream. There is no safe default
    /// dataset, so construction fails loudly.
    #[error("postcode source unavailable: {0}")]
    SourceUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("could not create the scoring thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_spinner().template("{spinner:.green} {pos} postcodes indexed")
}

/// Streams raw postcodes from `source`, inserting each into the exact
/// index, the BK-tree and the trie. The first source error aborts the
/// build with [`BuildError::SourceUnavailable`].
pub fn build<I, E>(source: I) -> Result<Engine, BuildError>
where
    I: IntoIterator<Item = Result<String, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let start = Instant::now();

    let mut exact = ExactIndex::new();
    let mut bk_tree = BkTree::new();
    let mut trie = Trie::new();
    let mut postcodes: Vec<String> = Vec::new();

    let progress = ProgressBar::new_spinner();
    progress.set_style(progress_style());

    for item in source {
        let postcode = item.map_err(|e| BuildError::SourceUnavailable(Box::new(e)))?;
        let normalized = normalize(&postcode);

        exact.insert(&normalized, &postcode);
        bk_tree.add(&normalized);
        trie.insert(&normalized, &postcode);
        postcodes.push(postcode);

        if postcodes.len() % BATCH_SIZE == 0 {
            progress.set_position(postcodes.len() as u64);
        }
    }
    progress.finish_and_clear();

    info!(
        "Indexed {} postcodes ({} BK-tree nodes) in {:.2}ms",
        postcodes.len(),
        bk_tree.len(),
        start.elapsed().as_secs_f64() * 1e3
    );

    Engine::from_parts(EngineParts {
        exact,
        bk_tree,
        trie,
        postcodes,
    })
}
