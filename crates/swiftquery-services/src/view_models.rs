//! View models for the presentation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swiftquery_core::{CellId, ResultSet};
use swiftquery_query::{
    ExecutionState, FilterCondition, PageSlice, PaginationState, QueryCell,
};

/// Pager position, e.g. "Page 2 of 3, rows 501 - 1000"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub current_page: u32,
    pub total_pages: u32,
    /// 1-based first and last displayed rows, absent for an empty page
    pub row_range: Option<(usize, usize)>,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

impl PageView {
    pub fn new(state: &PaginationState, slice: &PageSlice) -> Self {
        Self {
            current_page: state.current_page,
            total_pages: state.total_pages(),
            row_range: slice.display_range(),
            can_go_previous: state.has_previous(),
            can_go_next: state.has_next(),
        }
    }
}

/// Observable state of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub id: CellId,
    pub query_text: String,
    pub state: ExecutionState,
    pub row_count: usize,
    pub filter_enabled: bool,
    pub active_filters: Vec<FilterCondition>,
    pub error: Option<String>,
    pub error_at: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub columns: Vec<String>,
    /// Acknowledgement text when the result is a single status record
    pub status_text: Option<String>,
    pub page: Option<PageView>,
    pub is_active: bool,
}

impl CellView {
    pub fn new(cell: &QueryCell, result: Option<&ResultSet>, page: Option<PageView>, is_active: bool) -> Self {
        let status_text = result
            .filter(|r| r.is_status_only())
            .and_then(|r| r.rows.first())
            .and_then(|row| row.values().next())
            .map(|v| v.to_string());

        Self {
            id: cell.id(),
            query_text: cell.query_text().to_string(),
            state: cell.execution_state(),
            row_count: cell.row_count(),
            filter_enabled: cell.filter_enabled(),
            active_filters: cell.active_filters().to_vec(),
            error: cell.last_error().map(|e| e.message.clone()),
            error_at: cell.last_error().map(|e| e.occurred_at),
            last_duration_ms: cell.last_duration_ms(),
            columns: result.map(|r| r.columns.clone()).unwrap_or_default(),
            status_text,
            page,
            is_active,
        }
    }

    /// Status bar text for the cell's last action
    pub fn status_message(&self) -> String {
        let timing = self
            .last_duration_ms
            .map(|ms| format!(" ({}ms)", ms))
            .unwrap_or_default();
        match self.state {
            ExecutionState::Idle => "Ready".to_string(),
            ExecutionState::Running => "Running query...".to_string(),
            ExecutionState::Failed => format!(
                "Query failed: {}{}",
                self.error.as_deref().unwrap_or("An unknown error occurred"),
                timing
            ),
            ExecutionState::Succeeded => match &self.status_text {
                Some(text) => format!("{}{}", text, timing),
                None => format!("Query finished. {} rows returned.{}", self.row_count, timing),
            },
        }
    }
}

/// Observable state of the whole session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub cells: Vec<CellView>,
    pub active_cell_id: Option<CellId>,
    /// Duration of the most recently completed execution in the session
    pub last_query_time_ms: Option<u64>,
}

impl SessionView {
    pub fn active_cell(&self) -> Option<&CellView> {
        let id = self.active_cell_id?;
        self.cells.iter().find(|c| c.id == id)
    }
}
