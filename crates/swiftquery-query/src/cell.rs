//! Query cell model

use crate::filter::FilterCondition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swiftquery_core::CellId;

/// Execution lifecycle state of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl ExecutionState {
    /// States from which a new run may start
    pub fn can_start(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Reference to the cell's entry in the result cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultHandle {
    pub cell_id: CellId,
    /// Execution epoch that produced the result
    pub epoch: u64,
}

/// Error recorded by the last failed execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellError {
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl CellError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Running,
    Succeeded(ResultHandle),
    Failed(CellError),
}

/// One editable query unit and its execution lifecycle.
///
/// The result handle only exists while `Succeeded` and the error only while
/// `Failed`; both live inside the phase so no other combination can be built.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCell {
    id: CellId,
    query_text: String,
    phase: Phase,
    row_count: usize,
    filter_enabled: bool,
    active_filters: Vec<FilterCondition>,
    last_duration_ms: Option<u64>,
}

impl QueryCell {
    /// New idle cell with empty query text
    pub fn new() -> Self {
        Self::with_id(CellId::new())
    }

    pub fn with_id(id: CellId) -> Self {
        Self {
            id,
            query_text: String::new(),
            phase: Phase::Idle,
            row_count: 0,
            filter_enabled: false,
            active_filters: Vec::new(),
            last_duration_ms: None,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// Replace the query text; execution state is untouched
    pub fn set_query_text(&mut self, text: impl Into<String>) {
        self.query_text = text.into();
    }

    pub fn execution_state(&self) -> ExecutionState {
        match self.phase {
            Phase::Idle => ExecutionState::Idle,
            Phase::Running => ExecutionState::Running,
            Phase::Succeeded(_) => ExecutionState::Succeeded,
            Phase::Failed(_) => ExecutionState::Failed,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running)
    }

    pub fn result_handle(&self) -> Option<&ResultHandle> {
        match &self.phase {
            Phase::Succeeded(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&CellError> {
        match &self.phase {
            Phase::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    pub fn active_filters(&self) -> &[FilterCondition] {
        &self.active_filters
    }

    /// Duration of the most recent completed execution
    pub fn last_duration_ms(&self) -> Option<u64> {
        self.last_duration_ms
    }

    pub(crate) fn begin_run(&mut self) {
        self.phase = Phase::Running;
        self.active_filters.clear();
        self.filter_enabled = false;
        self.row_count = 0;
    }

    pub(crate) fn succeed(
        &mut self,
        handle: ResultHandle,
        row_count: usize,
        filter_enabled: bool,
        active_filters: Vec<FilterCondition>,
        duration_ms: u64,
    ) {
        self.phase = Phase::Succeeded(handle);
        self.row_count = row_count;
        self.filter_enabled = filter_enabled;
        self.active_filters = active_filters;
        self.last_duration_ms = Some(duration_ms);
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>, duration_ms: u64) {
        self.phase = Phase::Failed(CellError::new(message));
        self.row_count = 0;
        self.filter_enabled = false;
        self.last_duration_ms = Some(duration_ms);
    }

    pub(crate) fn reset_idle(&mut self) {
        self.phase = Phase::Idle;
        self.row_count = 0;
        self.filter_enabled = false;
    }

    pub(crate) fn set_active_filters(&mut self, filters: Vec<FilterCondition>) {
        self.active_filters = filters;
    }

    pub(crate) fn clear_active_filters(&mut self) {
        self.active_filters.clear();
    }
}

impl Default for QueryCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOperator;

    #[test]
    fn test_new_cell_is_idle_and_empty() {
        let cell = QueryCell::new();
        assert_eq!(cell.execution_state(), ExecutionState::Idle);
        assert_eq!(cell.query_text(), "");
        assert!(cell.result_handle().is_none());
        assert!(cell.last_error().is_none());
    }

    #[test]
    fn test_editing_text_keeps_state() {
        let mut cell = QueryCell::new();
        cell.begin_run();
        cell.set_query_text("SELECT 1");
        assert_eq!(cell.execution_state(), ExecutionState::Running);
        assert_eq!(cell.query_text(), "SELECT 1");
    }

    #[test]
    fn test_handle_and_error_follow_phase() {
        let mut cell = QueryCell::new();
        let handle = ResultHandle {
            cell_id: cell.id(),
            epoch: 1,
        };

        cell.begin_run();
        cell.succeed(handle, 3, true, vec![], 12);
        assert_eq!(cell.result_handle(), Some(&handle));
        assert!(cell.last_error().is_none());

        cell.begin_run();
        assert!(cell.result_handle().is_none());

        cell.fail("syntax error", 4);
        assert_eq!(cell.last_error().map(|e| e.message.as_str()), Some("syntax error"));
        assert!(cell.result_handle().is_none());
        assert_eq!(cell.row_count(), 0);
        assert_eq!(cell.last_duration_ms(), Some(4));
    }

    #[test]
    fn test_begin_run_clears_filters() {
        let mut cell = QueryCell::new();
        let handle = ResultHandle {
            cell_id: cell.id(),
            epoch: 1,
        };
        let filters = vec![FilterCondition::new("id", FilterOperator::Equal, "1")];
        cell.succeed(handle, 1, true, filters, 1);

        cell.begin_run();

        assert!(cell.active_filters().is_empty());
        assert!(!cell.filter_enabled());
        assert!(!cell.execution_state().can_start());
    }
}
