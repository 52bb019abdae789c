//! Execution history
//!
//! Every run that reaches the backend and completes is recorded, newest
//! first. Cancelled and discarded runs never land here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use swiftquery_core::CellId;
use uuid::Uuid;

/// How a recorded run ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum RecordedResult {
    Rows(u64),
    Error(String),
}

/// One completed execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub cell_id: CellId,
    /// SQL sent to the backend, filter wrapping included
    pub sql: String,
    pub executed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub result: RecordedResult,
}

impl ExecutionRecord {
    fn new(cell_id: CellId, sql: String, duration_ms: u64, result: RecordedResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            cell_id,
            sql,
            executed_at: Utc::now(),
            duration_ms,
            result,
        }
    }

    pub fn success(cell_id: CellId, sql: String, duration_ms: u64, row_count: u64) -> Self {
        Self::new(cell_id, sql, duration_ms, RecordedResult::Rows(row_count))
    }

    pub fn failure(cell_id: CellId, sql: String, duration_ms: u64, error: String) -> Self {
        Self::new(cell_id, sql, duration_ms, RecordedResult::Error(error))
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.result, RecordedResult::Rows(_))
    }

    pub fn row_count(&self) -> Option<u64> {
        match self.result {
            RecordedResult::Rows(n) => Some(n),
            RecordedResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.result {
            RecordedResult::Rows(_) => None,
            RecordedResult::Error(message) => Some(message),
        }
    }
}

/// Bounded run log shared by every cell of a coordinator
#[derive(Debug)]
pub struct ExecutionHistory {
    records: VecDeque<ExecutionRecord>,
    limit: usize,
}

impl ExecutionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit.min(64)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn record(&mut self, record: ExecutionRecord) {
        tracing::debug!(
            cell_id = %record.cell_id,
            succeeded = record.succeeded(),
            duration_ms = record.duration_ms,
            "recording execution"
        );
        self.records.push_front(record);
        self.records.truncate(self.limit);
    }

    /// Newest first
    pub fn records(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&ExecutionRecord> {
        self.records.front()
    }

    pub fn for_cell(&self, cell_id: CellId) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter().filter(move |r| r.cell_id == cell_id)
    }

    /// Records whose SQL contains `needle`, ignoring case
    pub fn search<'a>(&'a self, needle: &str) -> impl Iterator<Item = &'a ExecutionRecord> {
        let needle = needle.to_lowercase();
        self.records
            .iter()
            .filter(move |r| r.sql.to_lowercase().contains(&needle))
    }

    pub fn clear(&mut self) {
        tracing::info!(records = self.records.len(), "clearing execution history");
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_newest_first_and_bounded() {
        let mut history = ExecutionHistory::new(2);
        let cell = CellId::new();

        history.record(ExecutionRecord::success(cell, "SELECT 1".into(), 5, 1));
        history.record(ExecutionRecord::success(cell, "SELECT 2".into(), 5, 1));
        history.record(ExecutionRecord::failure(cell, "SELECT 3".into(), 5, "boom".into()));

        let sql: Vec<_> = history.records().map(|r| r.sql.as_str()).collect();
        assert_eq!(sql, vec!["SELECT 3", "SELECT 2"]);
        assert_eq!(history.latest().and_then(|r| r.error()), Some("boom"));
    }

    #[test]
    fn test_for_cell_and_search() {
        let mut history = ExecutionHistory::default();
        let a = CellId::new();
        let b = CellId::new();

        history.record(ExecutionRecord::success(a, "SELECT * FROM customers".into(), 1, 10));
        history.record(ExecutionRecord::failure(b, "SELECT * FROM orders".into(), 1, "no such table".into()));

        assert_eq!(history.for_cell(a).count(), 1);
        assert_eq!(history.for_cell(a).next().and_then(|r| r.row_count()), Some(10));
        let found: Vec<_> = history.search("ORDERS").collect();
        assert_eq!(found.len(), 1);
        assert!(!found[0].succeeded());
    }

    #[test]
    fn test_clear() {
        let mut history = ExecutionHistory::default();
        history.record(ExecutionRecord::success(CellId::new(), "SELECT 1".into(), 1, 1));
        history.clear();
        assert!(history.is_empty());
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_recorded_result_serializes_tagged() {
        let json = serde_json::to_string(&RecordedResult::Rows(3)).unwrap();
        assert_eq!(json, r#"{"kind":"rows","detail":3}"#);
    }
}
