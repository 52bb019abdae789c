//! Column statistics.
//!
//! Per-column aggregates computed on demand from a cell's cached result set,
//! and a per-cell cache of those aggregates that is dropped whenever the
//! cell's result set is replaced or removed.

mod engine;
#[cfg(test)]
mod tests;

pub use engine::{ColumnStatistics, NumericSummary, StatisticsEngine, compute_stats};
