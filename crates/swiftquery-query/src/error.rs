//! Workbench errors

use swiftquery_core::{CellId, SwiftQueryError};
use thiserror::Error;

pub type WorkbenchResult<T> = Result<T, WorkbenchError>;

/// Errors returned by workbench actions.
///
/// Validation errors (`InvalidColumn`, `MissingValue`, `OutOfRange`, ...)
/// are raised before any state is touched, so a rejected action never
/// leaves a partial mutation behind.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error("Query execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Cell {0} is already running")]
    AlreadyRunning(CellId),

    #[error("Column '{0}' is not part of the result")]
    InvalidColumn(String),

    #[error("Please provide a value for the filter: '{column}' {operator} ?")]
    MissingValue { column: String, operator: String },

    #[error("Page {page} is out of range (1..={total_pages})")]
    OutOfRange { page: u32, total_pages: u32 },

    #[error("No active cell")]
    NoActiveCell,

    #[error("Cancelled")]
    Cancelled,

    #[error("Cell {0} not found")]
    CellNotFound(CellId),

    #[error("Cell {0} has no result set")]
    NoResultSet(CellId),

    #[error("No result columns available to filter for cell {0}")]
    FiltersUnavailable(CellId),

    #[error("At least one filter condition is required")]
    LastFilterCondition,

    #[error("Filter row {index} does not exist ({rows} rows)")]
    FilterRowOutOfRange { index: usize, rows: usize },

    #[error("Please enter a valid table name")]
    BlankTableName,

    #[error("Backend error: {0}")]
    Backend(#[from] SwiftQueryError),

    #[error("Execution task failed: {0}")]
    TaskFailed(String),
}

impl WorkbenchError {
    /// True for errors caused by invalid caller input rather than the backend
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidColumn(_)
                | Self::MissingValue { .. }
                | Self::OutOfRange { .. }
                | Self::LastFilterCondition
                | Self::FilterRowOutOfRange { .. }
                | Self::BlankTableName
        )
    }
}
