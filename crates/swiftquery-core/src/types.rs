//! Core types for SwiftQuery

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of rows shown per result page
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Column name used by backends for single-record acknowledgements
/// (e.g. "1 row affected.")
pub const STATUS_COLUMN: &str = "status";

/// Stable identifier of a query cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(Uuid);

impl CellId {
    /// Create a fresh, random cell id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CellId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value in a result record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
}

/// Key used when counting distinct values.
///
/// Numbers compare by numeric value (so `1` and `1.0` collide) but never
/// collide with text, so the number `1` and the string `"1"` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DistinctKey {
    Bool(bool),
    Number(String),
    Text(String),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Coerce to a number.
    ///
    /// Numbers convert directly (NaN excluded); strings convert when their
    /// trimmed text parses as a finite number. Booleans, NULL and blank
    /// strings are not numeric.
    pub fn as_f64_coerced(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) if !v.is_nan() => Some(*v),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Key for distinct-value counting, `None` for NULL
    pub fn distinct_key(&self) -> Option<DistinctKey> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(DistinctKey::Bool(*v)),
            Value::Int64(v) => Some(DistinctKey::Number(v.to_string())),
            Value::Float64(v) => Some(DistinctKey::Number(canonical_float(*v))),
            Value::String(s) => Some(DistinctKey::Text(s.clone())),
        }
    }
}

fn canonical_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == 0.0 {
        "0".to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        (v as i64).to_string()
    } else {
        v.to_string()
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// A result record: column name to value, in column order
pub type Record = IndexMap<String, Value>;

/// Materialized rows and metadata from one successful execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names, in display order
    pub columns: Vec<String>,
    /// Materialized rows
    pub rows: Vec<Record>,
    /// Total matching rows reported by the backend, which may exceed
    /// the rows materialized here
    #[serde(default)]
    pub total_rows_estimate: Option<u64>,
    /// Rows per page when this result is paginated
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl ResultSet {
    /// Create an empty result set
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            total_rows_estimate: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Build a result set whose columns are derived from the first row
    pub fn from_rows(rows: Vec<Record>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            columns,
            rows,
            ..Self::empty()
        }
    }

    /// Build a result set with an explicit column list
    pub fn with_columns(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self {
            columns,
            rows,
            ..Self::empty()
        }
    }

    /// Single acknowledgement record for statements that return no rows
    pub fn status(message: impl Into<String>) -> Self {
        let mut record = Record::new();
        record.insert(STATUS_COLUMN.to_string(), Value::String(message.into()));
        Self::from_rows(vec![record])
    }

    /// Set the backend's total-row estimate
    pub fn with_total_rows_estimate(mut self, total: u64) -> Self {
        self.total_rows_estimate = Some(total);
        self
    }

    /// Set the page size (clamped to at least 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Get the number of materialized rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has rows
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Check whether a column is part of this result's schema
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// True when the result is a single status/acknowledgement record
    pub fn is_status_only(&self) -> bool {
        self.rows.len() == 1 && self.columns.len() == 1 && self.columns[0] == STATUS_COLUMN
    }

    /// True when the result looks like tabular row data a user can filter
    pub fn looks_tabular(&self) -> bool {
        !self.columns.is_empty() && !self.is_status_only()
    }

    /// Copy out the rows in `offset..offset + limit`
    pub fn slice(&self, offset: usize, limit: usize) -> Vec<Record> {
        self.rows.iter().skip(offset).take(limit).cloned().collect()
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::empty()
    }
}
