//! Durable per-variant execution counters

use std::path::PathBuf;

use super::data_store::SimpleDataStore;

/// Tracks how many times each campaign variant's trigger expression has
/// matched, across sessions.
///
/// Counts are monotonically non-decreasing for a variant and survive
/// restarts; show-conditions read them to gate how often a matched trigger
/// is actually allowed to fire.
pub struct ExecutionCountManager {
    store: SimpleDataStore<i64, i64>,
}

impl ExecutionCountManager {
    /// Open the counter store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: SimpleDataStore::open(path, ' '),
        }
    }

    /// Current execution count for a variant, zero if never matched
    pub fn execution_count(&self, variant_id: i64) -> i64 {
        self.store.get_or_default(&variant_id, 0)
    }

    /// Increment a variant's execution count by one and persist it
    pub fn increment_execution_count(&self, variant_id: i64) {
        let count = self.store.get_or_default(&variant_id, 0);
        self.store.put(variant_id, count + 1);
    }
}
