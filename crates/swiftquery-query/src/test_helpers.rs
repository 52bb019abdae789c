//! Scriptable backend for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use swiftquery_core::{
    CancellationToken, PageRequest, QueryBackend, Record, Result, ResultSet, SchemaTree,
    SwiftQueryError, Value,
};
use tokio::sync::Semaphore;

/// Canned response for queries matching a pattern
#[derive(Clone)]
pub enum StubResponse {
    Rows(ResultSet),
    Error(String),
    /// Backend gave up on its own, without the token being cancelled
    Cancelled,
    Timeout(String),
}

/// Holds matching executions open until released
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn release(&self) {
        self.0.add_permits(1);
    }
}

#[derive(Default)]
pub struct StubBackend {
    responses: Mutex<Vec<(String, StubResponse)>>,
    gates: Mutex<Vec<(String, Gate)>>,
    executed: Mutex<Vec<String>>,
    page_requests: Mutex<Vec<PageRequest>>,
    full_result: Mutex<Option<ResultSet>>,
}

impl StubBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Respond to queries containing `pattern` (first match wins)
    pub fn respond(&self, pattern: &str, response: StubResponse) {
        self.responses.lock().push((pattern.to_string(), response));
    }

    /// Hold queries containing `pattern` until the returned gate is released
    pub fn hold(&self, pattern: &str) -> Gate {
        let gate = Gate(Arc::new(Semaphore::new(0)));
        self.gates.lock().push((pattern.to_string(), gate.clone()));
        gate
    }

    /// Rows served by `fetch_page`
    pub fn serve_pages_from(&self, result: ResultSet) {
        *self.full_result.lock() = Some(result);
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn page_requests(&self) -> Vec<PageRequest> {
        self.page_requests.lock().clone()
    }
}

#[async_trait]
impl QueryBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn execute(&self, sql: &str, cancel: CancellationToken) -> Result<ResultSet> {
        self.executed.lock().push(sql.to_string());

        let gate = self
            .gates
            .lock()
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, gate)| gate.clone());
        if let Some(gate) = gate {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SwiftQueryError::Cancelled),
                permit = gate.0.acquire() => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                }
            }
        }

        let response = self
            .responses
            .lock()
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());
        match response {
            Some(StubResponse::Rows(result)) => Ok(result),
            Some(StubResponse::Error(message)) => Err(SwiftQueryError::Query(message)),
            Some(StubResponse::Cancelled) => Err(SwiftQueryError::Cancelled),
            Some(StubResponse::Timeout(message)) => Err(SwiftQueryError::Timeout(message)),
            None => Ok(ResultSet::empty()),
        }
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<ResultSet> {
        self.page_requests.lock().push(request.clone());
        let full = self.full_result.lock().clone();
        match full {
            Some(full) => Ok(ResultSet::with_columns(
                full.columns.clone(),
                full.slice(request.offset(), request.page_size),
            )),
            None => Err(SwiftQueryError::NotSupported("no pages".into())),
        }
    }

    async fn list_schema(&self) -> Result<SchemaTree> {
        Ok(SchemaTree::default())
    }
}

/// `n` rows of `{id, name}`
pub fn customers(n: i64) -> ResultSet {
    let rows = (1..=n)
        .map(|i| {
            let mut record = Record::new();
            record.insert("id".into(), Value::Int64(i));
            record.insert("name".into(), Value::String(format!("customer {i}")));
            record
        })
        .collect();
    ResultSet::from_rows(rows)
}
