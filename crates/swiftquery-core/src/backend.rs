//! Query backend capability trait

use crate::{CellId, Result, ResultSet, SchemaTree, SwiftQueryError};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Request for one page of a cell's result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Cell whose result is being paged
    pub cell_id: CellId,
    /// SQL that produced the result
    pub sql: String,
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub page_size: usize,
}

impl PageRequest {
    /// Zero-based offset of the first row on this page
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size
    }
}

/// The execution capability the workbench is wired to.
///
/// Implementations own everything about the data source: parsing,
/// planning, timeouts and transport. The workbench only orchestrates.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Human-readable backend name (shown in the status bar)
    fn name(&self) -> &str {
        "backend"
    }

    /// Execute a query.
    ///
    /// The token is cancelled when the workbench no longer wants the result.
    /// Backends should stop promptly and return `SwiftQueryError::Cancelled`;
    /// a result that arrives anyway is discarded by the caller.
    async fn execute(&self, sql: &str, cancel: CancellationToken) -> Result<ResultSet>;

    /// Fetch a single page of a previously executed query
    async fn fetch_page(&self, request: &PageRequest) -> Result<ResultSet> {
        tracing::debug!(cell_id = %request.cell_id, page = request.page, "fetch_page not supported by backend");
        Err(SwiftQueryError::NotSupported(
            "Paged fetching not supported by this backend".into(),
        ))
    }

    /// List the schema tree for the schema browser
    async fn list_schema(&self) -> Result<SchemaTree>;
}
