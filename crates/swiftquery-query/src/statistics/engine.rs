use crate::error::{WorkbenchError, WorkbenchResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use swiftquery_core::{CellId, ResultSet};

/// min/max/sum/mean over the numeric values of a column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
}

/// Aggregate statistics for one column of a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub column_name: String,
    pub total_count: usize,
    pub non_null_count: usize,
    pub null_count: usize,
    pub distinct_count: usize,
    /// Present only when the column was judged numeric
    pub numeric: Option<NumericSummary>,
}

impl ColumnStatistics {
    pub fn is_numeric(&self) -> bool {
        self.numeric.is_some()
    }

    pub fn min(&self) -> Option<f64> {
        self.numeric.map(|n| n.min)
    }

    pub fn max(&self) -> Option<f64> {
        self.numeric.map(|n| n.max)
    }

    pub fn sum(&self) -> Option<f64> {
        self.numeric.map(|n| n.sum)
    }

    pub fn mean(&self) -> Option<f64> {
        self.numeric.map(|n| n.mean)
    }
}

#[derive(Default)]
struct NumericAccumulator {
    count: usize,
    min: f64,
    max: f64,
    sum: f64,
}

impl NumericAccumulator {
    fn push(&mut self, n: f64) {
        if self.count == 0 {
            self.min = n;
            self.max = n;
        } else {
            self.min = self.min.min(n);
            self.max = self.max.max(n);
        }
        self.sum += n;
        self.count += 1;
    }

    fn finish(self) -> Option<NumericSummary> {
        (self.count > 0).then(|| NumericSummary {
            min: self.min,
            max: self.max,
            sum: self.sum,
            mean: self.sum / self.count as f64,
        })
    }
}

/// Compute statistics for `column` in a single pass over the rows.
///
/// A row that lacks the column counts as null. Whether the column is
/// numeric is decided by the first non-null value; after that, values that
/// do not coerce to a number are skipped for min/max/sum/mean but still
/// count toward the non-null and distinct totals.
pub fn compute_stats(result: &ResultSet, column: &str) -> WorkbenchResult<ColumnStatistics> {
    if !result.has_column(column) {
        return Err(WorkbenchError::InvalidColumn(column.to_string()));
    }

    let mut non_null_count = 0;
    let mut distinct = HashSet::new();
    let mut numeric_column: Option<bool> = None;
    let mut numbers = NumericAccumulator::default();

    for row in &result.rows {
        let Some(value) = row.get(column).filter(|v| !v.is_null()) else {
            continue;
        };
        non_null_count += 1;

        if let Some(key) = value.distinct_key() {
            distinct.insert(key);
        }

        let coerced = value.as_f64_coerced();
        if *numeric_column.get_or_insert(coerced.is_some())
            && let Some(n) = coerced
        {
            numbers.push(n);
        }
    }

    let total_count = result.rows.len();
    Ok(ColumnStatistics {
        column_name: column.to_string(),
        total_count,
        non_null_count,
        null_count: total_count - non_null_count,
        distinct_count: distinct.len(),
        numeric: numbers.finish(),
    })
}

/// Per-cell cache of computed column statistics
#[derive(Default)]
pub struct StatisticsEngine {
    entries: RwLock<HashMap<CellId, HashMap<String, ColumnStatistics>>>,
}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return cached statistics for the column, computing them on a miss
    pub fn column_statistics(
        &self,
        cell_id: CellId,
        result: &ResultSet,
        column: &str,
    ) -> WorkbenchResult<ColumnStatistics> {
        if let Some(stats) = self.cached(cell_id, column) {
            return Ok(stats);
        }
        let stats = compute_stats(result, column)?;
        self.store(cell_id, stats.clone());
        Ok(stats)
    }

    pub fn cached(&self, cell_id: CellId, column: &str) -> Option<ColumnStatistics> {
        let stats = self
            .entries
            .read()
            .get(&cell_id)
            .and_then(|columns| columns.get(column))
            .cloned();
        tracing::trace!(cell_id = %cell_id, column, hit = stats.is_some(), "statistics lookup");
        stats
    }

    pub fn store(&self, cell_id: CellId, stats: ColumnStatistics) {
        self.entries
            .write()
            .entry(cell_id)
            .or_default()
            .insert(stats.column_name.clone(), stats);
    }

    /// Drop every cached column for the cell
    pub fn invalidate(&self, cell_id: CellId) {
        if let Some(columns) = self.entries.write().remove(&cell_id) {
            tracing::debug!(cell_id = %cell_id, columns = columns.len(), "invalidated column statistics");
        }
    }

    pub fn has_entries(&self, cell_id: CellId) -> bool {
        self.entries
            .read()
            .get(&cell_id)
            .is_some_and(|columns| !columns.is_empty())
    }
}
