//! Result cache: the last successful result set of every cell

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use swiftquery_core::{CellId, ResultSet};

/// Materialized results keyed by cell.
///
/// Holds at most one entry per cell; `put` swaps the whole entry under the
/// write lock, so readers see either the old or the new result, never a mix.
/// There is no eviction: entries live until the cell re-runs or is deleted.
#[derive(Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<CellId, Arc<ResultSet>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result, replacing any prior entry for the cell
    pub fn put(&self, cell_id: CellId, result: ResultSet) -> Arc<ResultSet> {
        tracing::debug!(cell_id = %cell_id, rows = result.row_count(), "caching result set");
        let result = Arc::new(result);
        self.entries.write().insert(cell_id, result.clone());
        result
    }

    /// Get the cached result for a cell
    pub fn get(&self, cell_id: CellId) -> Option<Arc<ResultSet>> {
        let result = self.entries.read().get(&cell_id).cloned();
        if result.is_some() {
            tracing::trace!(cell_id = %cell_id, "result cache hit");
        } else {
            tracing::trace!(cell_id = %cell_id, "result cache miss");
        }
        result
    }

    /// Drop the cached result for a cell
    pub fn invalidate(&self, cell_id: CellId) {
        if self.entries.write().remove(&cell_id).is_some() {
            tracing::debug!(cell_id = %cell_id, "invalidated cached result set");
        }
    }

    pub fn contains(&self, cell_id: CellId) -> bool {
        self.entries.read().contains_key(&cell_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clear all cached results
    pub fn clear(&self) {
        let count = self.entries.read().len();
        tracing::info!(cache_entries = count, "clearing result cache");
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swiftquery_core::{Record, Value};

    fn one_row(n: i64) -> ResultSet {
        let mut record = Record::new();
        record.insert("n".into(), Value::Int64(n));
        ResultSet::from_rows(vec![record])
    }

    #[test]
    fn test_put_replaces_prior_entry() {
        let cache = ResultCache::new();
        let cell = CellId::new();

        cache.put(cell, one_row(1));
        cache.put(cell, one_row(2));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(cell).unwrap().rows[0]["n"], Value::Int64(2));
    }

    #[test]
    fn test_entries_are_cell_scoped() {
        let cache = ResultCache::new();
        let a = CellId::new();
        let b = CellId::new();

        cache.put(a, one_row(1));
        cache.put(b, one_row(2));
        cache.invalidate(a);

        assert!(cache.get(a).is_none());
        assert!(cache.contains(b));
    }

    #[test]
    fn test_reader_keeps_superseded_snapshot() {
        let cache = ResultCache::new();
        let cell = CellId::new();

        cache.put(cell, one_row(1));
        let held = cache.get(cell).unwrap();
        cache.put(cell, one_row(2));

        assert_eq!(held.rows[0]["n"], Value::Int64(1));
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new();
        cache.put(CellId::new(), one_row(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
