//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use swiftquery_core::{
    CancellationToken, ColumnNode, DatabaseNode, ObjectKind, ObjectNode, PageRequest,
    QueryBackend, Record, Result, ResultSet, SchemaNode, SchemaTree, SwiftQueryError, Value,
};
use tokio::sync::Semaphore;

/// Mock backend for exercising the session without a real database.
///
/// Queries containing a registered pattern get the matching response; the
/// first registered pattern wins. Queries matching a held pattern block
/// until the gate is released (or the execution is cancelled).
pub struct MockBackend {
    pub query_responses: Vec<(String, ResultSet)>,
    pub query_errors: Vec<(String, String)>,
    pub schema: SchemaTree,
    pub schema_fails: bool,
    holds: Mutex<Vec<(String, Arc<Semaphore>)>>,
    pub query_log: Arc<Mutex<Vec<String>>>,
    pub schema_loads: Arc<Mutex<usize>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            query_responses: vec![],
            query_errors: vec![],
            schema: sample_schema(),
            schema_fails: false,
            holds: Mutex::new(Vec::new()),
            query_log: Arc::new(Mutex::new(Vec::new())),
            schema_loads: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_query_response(mut self, sql_contains: impl Into<String>, result: ResultSet) -> Self {
        self.query_responses.push((sql_contains.into(), result));
        self
    }

    pub fn with_query_error(mut self, sql_contains: impl Into<String>, message: impl Into<String>) -> Self {
        self.query_errors.push((sql_contains.into(), message.into()));
        self
    }

    pub fn with_schema_failure(mut self) -> Self {
        self.schema_fails = true;
        self
    }

    /// Block queries containing `sql_contains`; returns the release handle
    pub fn hold(&self, sql_contains: impl Into<String>) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.holds.lock().push((sql_contains.into(), gate.clone()));
        gate
    }

    pub fn query_log(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }

    pub fn schema_loads(&self) -> usize {
        *self.schema_loads.lock()
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl QueryBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, sql: &str, cancel: CancellationToken) -> Result<ResultSet> {
        self.query_log.lock().push(sql.to_string());

        let gate = self
            .holds
            .lock()
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, gate)| gate.clone());
        if let Some(gate) = gate {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SwiftQueryError::Cancelled),
                permit = gate.acquire() => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                }
            }
        }

        for (pattern, message) in &self.query_errors {
            if sql.contains(pattern.as_str()) {
                return Err(SwiftQueryError::Query(message.clone()));
            }
        }
        for (pattern, result) in &self.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(ResultSet::status("Command executed successfully."))
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<ResultSet> {
        Err(SwiftQueryError::NotSupported(format!(
            "page {} of cell {}",
            request.page, request.cell_id
        )))
    }

    async fn list_schema(&self) -> Result<SchemaTree> {
        *self.schema_loads.lock() += 1;
        if self.schema_fails {
            return Err(SwiftQueryError::Schema("catalog unavailable".into()));
        }
        Ok(self.schema.clone())
    }
}

/// `n` customer rows with columns `[id, name]`
pub fn customers(n: i64) -> ResultSet {
    let rows = (1..=n)
        .map(|i| {
            let mut record = Record::new();
            record.insert("id".into(), Value::Int64(i));
            record.insert("name".into(), Value::String(format!("Customer {i}")));
            record
        })
        .collect();
    ResultSet::from_rows(rows)
}

pub fn sample_schema() -> SchemaTree {
    SchemaTree {
        databases: vec![DatabaseNode {
            name: "memory_db".into(),
            schemas: vec![
                SchemaNode {
                    name: "main".into(),
                    objects: vec![ObjectNode {
                        name: "customers".into(),
                        kind: ObjectKind::Table,
                        columns: vec![
                            ColumnNode::new("id", "INTEGER").primary_key(),
                            ColumnNode::new("name", "VARCHAR"),
                        ],
                    }],
                },
                SchemaNode {
                    name: "sales_reporting".into(),
                    objects: vec![ObjectNode {
                        name: "quarterly_sales".into(),
                        kind: ObjectKind::Table,
                        columns: vec![
                            ColumnNode::new("quarter", "VARCHAR").not_null(),
                            ColumnNode::new("total", "DECIMAL"),
                        ],
                    }],
                },
            ],
        }],
    }
}
