//! SwiftQuery Query - query cell execution for the workbench
//!
//! This crate provides:
//! - `CellExecutionCoordinator` - per-cell execution lifecycle against a `QueryBackend`
//! - `ResultCache` - the last successful result set of each cell
//! - `StatisticsEngine` - on-demand column statistics
//! - `filter` - filter conditions compiled to local predicates or WHERE clauses
//! - `PaginationController` - current page and page slices per cell
//! - `ExecutionHistory` - record of completed executions

mod cache;
mod cell;
mod error;
mod execution;
pub mod filter;
mod history;
mod pagination;
pub mod sql;
mod statistics;

#[cfg(test)]
mod test_helpers;

pub use cache::ResultCache;
pub use cell::{CellError, ExecutionState, QueryCell, ResultHandle};
pub use error::{WorkbenchError, WorkbenchResult};
pub use execution::{
    CellExecutionCoordinator, CoordinatorConfig, ExecutionOutcome, ExecutionTicket,
};
pub use filter::{FilterCondition, FilterDraft, FilterOperator, Predicate};
pub use history::{ExecutionHistory, ExecutionRecord, RecordedResult};
pub use pagination::{PageNavigation, PageSlice, PaginationController, PaginationState};
pub use statistics::{ColumnStatistics, NumericSummary, StatisticsEngine, compute_stats};
