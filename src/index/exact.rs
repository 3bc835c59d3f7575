//! Exact-match index: normalized postcode to all its original formatting
//! variants

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// O(1) fast path of the search pipeline. Several originals ("E14 9WB",
/// "e149wb") share a single normalized key.
#[derive(Serialize, Deserialize, Default)]
pub struct ExactIndex {
    entries: HashMap<String, Vec<String>>,
}

impl ExactIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an original under its normalized form. Re-inserting the
    /// same original is a no-op, so builds are idempotent.
    pub fn insert(&mut self, normalized: &str, original: &str) {
        let variants = self
            .entries
            .entry(normalized.to_string())
            .or_default();
        if !variants.iter().any(|v| v == original) {
            variants.push(original.to_string());
        }
    }

    /// All original variants for a normalized postcode, in insertion order.
    pub fn lookup(&self, normalized: &str) -> Option<&[String]> {
        self.entries.get(normalized).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
