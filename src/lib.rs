//! In-memory fuzzy search over the UK postcode reference set
//!
//! The engine answers typo-tolerant postcode queries in milliseconds by
//! combining three read-only structures built once at startup: an exact
//! index over normalized forms, a BK-tree for bounded edit-distance
//! search and a prefix trie used as a cheap first-pass filter. Built
//! structures can be persisted to a versioned cache artifact so the bulk
//! build only runs once.

pub mod base;
pub mod builder;
pub mod cache;
pub mod distance;
pub mod index {
    pub mod bktree;
    pub mod exact;
    pub mod trie;
}
pub mod search;

pub use builder::{build, BuildError};
pub use cache::{load, load_or_build, save, CacheError};
pub use search::engine::{Engine, EngineStats, SearchOptions};
pub use search::{ScoredPostcode, SearchMetadata, SearchOutcome};
