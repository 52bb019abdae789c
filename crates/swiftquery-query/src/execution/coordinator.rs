use crate::cache::ResultCache;
use crate::cell::{ExecutionState, QueryCell, ResultHandle};
use crate::error::{WorkbenchError, WorkbenchResult};
use crate::filter::{self, FilterCondition};
use crate::history::{ExecutionHistory, ExecutionRecord};
use crate::pagination::{PageNavigation, PageSlice, PaginationController, PaginationState};
use crate::sql::{compose_filtered_query, preview};
use crate::statistics::{ColumnStatistics, StatisticsEngine, compute_stats};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use swiftquery_core::{
    CancellationToken, CellId, DEFAULT_PAGE_SIZE, PageRequest, QueryBackend, ResultSet,
    SwiftQueryError,
};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Coordinator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Rows per result page
    pub page_size: usize,
    /// Maximum execution history entries
    pub history_limit: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            history_limit: 1000,
        }
    }
}

/// How an execution ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded { row_count: usize, duration_ms: u64 },
    Failed { message: String, duration_ms: u64 },
    /// The backend reported cancellation; the cell is back to `Idle`
    Cancelled,
    /// The completion arrived after the cell was cancelled, re-run or
    /// removed and was dropped without touching any state
    Discarded,
}

impl ExecutionOutcome {
    /// Rows on success, `ExecutionFailed` on failure, `Cancelled` otherwise
    pub fn into_result(self) -> WorkbenchResult<usize> {
        match self {
            Self::Succeeded { row_count, .. } => Ok(row_count),
            Self::Failed { message, .. } => Err(WorkbenchError::ExecutionFailed(message)),
            Self::Cancelled | Self::Discarded => Err(WorkbenchError::Cancelled),
        }
    }
}

/// Handle to a started execution
#[derive(Debug)]
pub struct ExecutionTicket {
    cell_id: CellId,
    epoch: u64,
    handle: JoinHandle<ExecutionOutcome>,
}

impl ExecutionTicket {
    pub fn cell_id(&self) -> CellId {
        self.cell_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Wait for the execution to be applied (or discarded)
    pub async fn wait(self) -> WorkbenchResult<ExecutionOutcome> {
        self.handle
            .await
            .map_err(|e| WorkbenchError::TaskFailed(e.to_string()))
    }
}

struct Inflight {
    token: CancellationToken,
}

struct CellEntry {
    cell: QueryCell,
    /// Bumped on every start, cancel and removal; completions carrying an
    /// older epoch are discarded
    epoch: u64,
    inflight: Option<Inflight>,
    /// SQL that produced the cached result, for paged fetches
    executed_sql: Option<String>,
}

struct Inner {
    backend: Arc<dyn QueryBackend>,
    cells: Mutex<HashMap<CellId, CellEntry>>,
    cache: ResultCache,
    statistics: StatisticsEngine,
    pagination: PaginationController,
    history: Arc<RwLock<ExecutionHistory>>,
    config: CoordinatorConfig,
}

/// Owns the execution lifecycle of every query cell.
///
/// All per-cell state lives behind one mutex that is held only for
/// bookkeeping, never across a backend call. Each run gets an epoch; the
/// spawned execution task applies its result only if the epoch is still
/// current when it completes. At most one execution is inflight per cell.
///
/// `start` and everything built on it (`run`, `apply_filters`) call
/// `tokio::spawn`, so they must be called from within a tokio runtime.
#[derive(Clone)]
pub struct CellExecutionCoordinator {
    inner: Arc<Inner>,
}

impl CellExecutionCoordinator {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_config(backend, CoordinatorConfig::default())
    }

    pub fn with_config(backend: Arc<dyn QueryBackend>, config: CoordinatorConfig) -> Self {
        let config = CoordinatorConfig {
            page_size: config.page_size.max(1),
            ..config
        };
        Self {
            inner: Arc::new(Inner {
                backend,
                cells: Mutex::new(HashMap::new()),
                cache: ResultCache::new(),
                statistics: StatisticsEngine::new(),
                pagination: PaginationController::new(),
                history: Arc::new(RwLock::new(ExecutionHistory::new(config.history_limit))),
                config,
            }),
        }
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.inner.config
    }

    pub fn backend(&self) -> Arc<dyn QueryBackend> {
        self.inner.backend.clone()
    }

    /// Track a cell
    pub fn register(&self, cell: QueryCell) -> CellId {
        let id = cell.id();
        self.inner.cells.lock().insert(
            id,
            CellEntry {
                cell,
                epoch: 0,
                inflight: None,
                executed_sql: None,
            },
        );
        tracing::debug!(cell_id = %id, "registered cell");
        id
    }

    /// Register a new empty, idle cell
    pub fn create_cell(&self) -> CellId {
        self.register(QueryCell::new())
    }

    /// Stop tracking a cell, cancelling its execution and releasing its
    /// cached result, statistics and pagination state
    pub fn remove(&self, cell_id: CellId) -> WorkbenchResult<QueryCell> {
        let mut cells = self.inner.cells.lock();
        let entry = cells
            .remove(&cell_id)
            .ok_or(WorkbenchError::CellNotFound(cell_id))?;
        if let Some(inflight) = entry.inflight {
            tracing::debug!(cell_id = %cell_id, "cancelling inflight execution of removed cell");
            inflight.token.cancel();
        }
        self.inner.release(cell_id);
        tracing::debug!(cell_id = %cell_id, "removed cell");
        Ok(entry.cell)
    }

    pub fn contains(&self, cell_id: CellId) -> bool {
        self.inner.cells.lock().contains_key(&cell_id)
    }

    /// Snapshot of a cell
    pub fn cell(&self, cell_id: CellId) -> Option<QueryCell> {
        self.inner
            .cells
            .lock()
            .get(&cell_id)
            .map(|entry| entry.cell.clone())
    }

    pub fn execution_state(&self, cell_id: CellId) -> Option<ExecutionState> {
        self.inner
            .cells
            .lock()
            .get(&cell_id)
            .map(|entry| entry.cell.execution_state())
    }

    /// Edit a cell's text. A running execution is left alone.
    pub fn set_query_text(&self, cell_id: CellId, text: impl Into<String>) -> WorkbenchResult<()> {
        let mut cells = self.inner.cells.lock();
        let entry = cells
            .get_mut(&cell_id)
            .ok_or(WorkbenchError::CellNotFound(cell_id))?;
        entry.cell.set_query_text(text);
        Ok(())
    }

    /// Start executing a cell.
    ///
    /// The request is the cell's query text, wrapped with a WHERE clause
    /// when the cell has active filters. Fails with `AlreadyRunning` if an
    /// execution is inflight for the cell.
    pub fn start(&self, cell_id: CellId) -> WorkbenchResult<ExecutionTicket> {
        let mut cells = self.inner.cells.lock();
        let entry = cells
            .get_mut(&cell_id)
            .ok_or(WorkbenchError::CellNotFound(cell_id))?;
        self.start_locked(cell_id, entry)
    }

    /// Start a cell and wait for its outcome
    pub async fn run(&self, cell_id: CellId) -> WorkbenchResult<ExecutionOutcome> {
        self.start(cell_id)?.wait().await
    }

    fn start_locked(
        &self,
        cell_id: CellId,
        entry: &mut CellEntry,
    ) -> WorkbenchResult<ExecutionTicket> {
        if entry.cell.is_running() {
            tracing::warn!(cell_id = %cell_id, "rejected run: cell is already running");
            return Err(WorkbenchError::AlreadyRunning(cell_id));
        }

        let filters = entry.cell.active_filters().to_vec();
        let predicate = filter::compile(&filters)?;
        let base = entry.cell.query_text().to_string();
        let sql = match predicate.where_clause() {
            Some(clause) => compose_filtered_query(&base, &clause),
            None => base,
        };

        entry.epoch += 1;
        let epoch = entry.epoch;
        let token = CancellationToken::new();
        entry.inflight = Some(Inflight {
            token: token.clone(),
        });
        entry.executed_sql = None;
        entry.cell.begin_run();
        self.inner.release(cell_id);

        tracing::debug!(cell_id = %cell_id, epoch, filters = filters.len(), "cell entered Running");

        let span = tracing::info_span!(
            "execute_cell",
            cell_id = %cell_id,
            epoch,
            sql_preview = %preview(&sql)
        );
        let inner = self.inner.clone();
        let backend = self.inner.backend.clone();
        let handle = tokio::spawn(
            async move {
                let started = Instant::now();
                let result = if sql.trim().is_empty() {
                    Ok(ResultSet::empty())
                } else {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(SwiftQueryError::Cancelled),
                        result = backend.execute(&sql, token.clone()) => result,
                    }
                };
                inner.complete(cell_id, epoch, sql, filters, started.elapsed(), result)
            }
            .instrument(span),
        );

        Ok(ExecutionTicket {
            cell_id,
            epoch,
            handle,
        })
    }

    /// Cancel a running execution; the cell returns to `Idle` at once.
    ///
    /// Returns `false` when nothing was running.
    pub fn cancel(&self, cell_id: CellId) -> WorkbenchResult<bool> {
        let mut cells = self.inner.cells.lock();
        let entry = cells
            .get_mut(&cell_id)
            .ok_or(WorkbenchError::CellNotFound(cell_id))?;
        let Some(inflight) = entry.inflight.take() else {
            return Ok(false);
        };
        entry.epoch += 1;
        entry.cell.reset_idle();
        inflight.token.cancel();
        tracing::debug!(cell_id = %cell_id, "cancelled execution, cell back to Idle");
        Ok(true)
    }

    /// Validate filter conditions against the cell's result and re-run the
    /// cell with them applied
    pub fn apply_filters(
        &self,
        cell_id: CellId,
        conditions: Vec<FilterCondition>,
    ) -> WorkbenchResult<ExecutionTicket> {
        let mut cells = self.inner.cells.lock();
        let entry = cells
            .get_mut(&cell_id)
            .ok_or(WorkbenchError::CellNotFound(cell_id))?;
        if entry.cell.is_running() {
            return Err(WorkbenchError::AlreadyRunning(cell_id));
        }
        if entry.cell.execution_state() != ExecutionState::Succeeded || !entry.cell.filter_enabled() {
            return Err(WorkbenchError::FiltersUnavailable(cell_id));
        }
        let result = self
            .inner
            .cache
            .get(cell_id)
            .ok_or(WorkbenchError::NoResultSet(cell_id))?;
        filter::validate(&conditions)?;
        filter::validate_columns(&conditions, &result.columns)?;

        tracing::debug!(cell_id = %cell_id, conditions = conditions.len(), "applying filters");
        entry.cell.set_active_filters(conditions);
        self.start_locked(cell_id, entry)
    }

    /// Drop the cell's active filters without re-running.
    ///
    /// Rejected with `AlreadyRunning` while an execution is inflight, since
    /// its completion reinstates the filters it was started with.
    pub fn clear_filters(&self, cell_id: CellId) -> WorkbenchResult<()> {
        let mut cells = self.inner.cells.lock();
        let entry = cells
            .get_mut(&cell_id)
            .ok_or(WorkbenchError::CellNotFound(cell_id))?;
        if entry.cell.is_running() {
            tracing::warn!(cell_id = %cell_id, "rejected clear filters: cell is running");
            return Err(WorkbenchError::AlreadyRunning(cell_id));
        }
        entry.cell.clear_active_filters();
        Ok(())
    }

    /// Filter the cached result locally, without re-executing
    pub fn preview_filters(
        &self,
        cell_id: CellId,
        conditions: &[FilterCondition],
    ) -> WorkbenchResult<ResultSet> {
        let result = self.cached_result(cell_id)?;
        filter::validate_columns(conditions, &result.columns)?;
        let predicate = filter::compile(conditions)?;
        Ok(predicate.filter(&result))
    }

    /// Statistics for one column of the cell's cached result
    pub fn column_statistics(
        &self,
        cell_id: CellId,
        column: &str,
    ) -> WorkbenchResult<ColumnStatistics> {
        if let Some(stats) = self.inner.statistics.cached(cell_id, column) {
            return Ok(stats);
        }
        let result = self.cached_result(cell_id)?;
        let stats = compute_stats(&result, column)?;

        let cells = self.inner.cells.lock();
        let still_current = cells.contains_key(&cell_id)
            && self
                .inner
                .cache
                .get(cell_id)
                .is_some_and(|current| Arc::ptr_eq(&current, &result));
        if still_current {
            self.inner.statistics.store(cell_id, stats.clone());
        }
        Ok(stats)
    }

    /// Previously computed statistics, if still valid
    pub fn cached_statistics(&self, cell_id: CellId, column: &str) -> Option<ColumnStatistics> {
        self.inner.statistics.cached(cell_id, column)
    }

    /// Jump to a page. Fails with `OutOfRange` outside `1..=total_pages`.
    ///
    /// Served from the cached rows when they cover the page, otherwise
    /// fetched from the backend.
    #[tracing::instrument(skip(self, cell_id), fields(cell_id = %cell_id))]
    pub async fn go_to_page(&self, cell_id: CellId, page: u32) -> WorkbenchResult<PageSlice> {
        let (epoch, state, result, sql) = {
            let cells = self.inner.cells.lock();
            let entry = cells
                .get(&cell_id)
                .ok_or(WorkbenchError::CellNotFound(cell_id))?;
            let state = self.inner.pagination.check_page(cell_id, page)?;
            let result = self
                .inner
                .cache
                .get(cell_id)
                .ok_or(WorkbenchError::NoResultSet(cell_id))?;
            (entry.epoch, state, result, entry.executed_sql.clone())
        };

        let slice = match state.local_slice(&result, page) {
            Some(slice) => slice,
            None => {
                let request = PageRequest {
                    cell_id,
                    sql: sql.unwrap_or_default(),
                    page,
                    page_size: state.page_size,
                };
                tracing::debug!(page, "fetching page from backend");
                let fetched = self.inner.backend.fetch_page(&request).await?;
                PageSlice::new(page, request.offset(), fetched.rows)
            }
        };

        let cells = self.inner.cells.lock();
        match cells.get(&cell_id) {
            Some(entry) if entry.epoch == epoch => {
                self.inner.pagination.commit(cell_id, slice.clone());
                Ok(slice)
            }
            _ => {
                tracing::debug!(page, "discarding page fetched for a superseded result");
                Err(WorkbenchError::Cancelled)
            }
        }
    }

    /// UI navigation: `Ok(None)` when the request is a boundary no-op
    pub async fn navigate_page(
        &self,
        cell_id: CellId,
        navigation: PageNavigation,
    ) -> WorkbenchResult<Option<PageSlice>> {
        match self.inner.pagination.navigate(cell_id, navigation) {
            Some(page) => self.go_to_page(cell_id, page).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn current_page(&self, cell_id: CellId) -> Option<PageSlice> {
        self.inner.pagination.current_slice(cell_id)
    }

    pub fn pagination_state(&self, cell_id: CellId) -> Option<PaginationState> {
        self.inner.pagination.state(cell_id)
    }

    /// The cell's cached result set
    pub fn result_set(&self, cell_id: CellId) -> Option<Arc<ResultSet>> {
        self.inner.cache.get(cell_id)
    }

    pub fn history(&self) -> Arc<RwLock<ExecutionHistory>> {
        self.inner.history.clone()
    }

    fn cached_result(&self, cell_id: CellId) -> WorkbenchResult<Arc<ResultSet>> {
        if !self.contains(cell_id) {
            return Err(WorkbenchError::CellNotFound(cell_id));
        }
        self.inner
            .cache
            .get(cell_id)
            .ok_or(WorkbenchError::NoResultSet(cell_id))
    }
}

impl Inner {
    fn release(&self, cell_id: CellId) {
        self.cache.invalidate(cell_id);
        self.statistics.invalidate(cell_id);
        self.pagination.remove(cell_id);
    }

    fn complete(
        &self,
        cell_id: CellId,
        epoch: u64,
        sql: String,
        filters: Vec<FilterCondition>,
        elapsed: Duration,
        result: swiftquery_core::Result<ResultSet>,
    ) -> ExecutionOutcome {
        let mut cells = self.cells.lock();
        let entry = match cells.get_mut(&cell_id) {
            Some(entry) if entry.epoch == epoch => entry,
            _ => {
                tracing::debug!(cell_id = %cell_id, epoch, "discarding stale completion");
                return ExecutionOutcome::Discarded;
            }
        };
        entry.inflight = None;
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(result) => {
                let result = result.with_page_size(self.config.page_size);
                let row_count = result.row_count();
                let filter_enabled = result.looks_tabular();
                let filters: Vec<_> = if filter_enabled {
                    filters
                        .into_iter()
                        .filter(|f| result.has_column(&f.column))
                        .collect()
                } else {
                    Vec::new()
                };

                let cached = self.cache.put(cell_id, result);
                self.statistics.invalidate(cell_id);
                self.pagination.reset(cell_id, &cached);
                entry.executed_sql = Some(sql.clone());
                entry.cell.succeed(
                    ResultHandle { cell_id, epoch },
                    row_count,
                    filter_enabled,
                    filters,
                    duration_ms,
                );
                self.history.write().record(ExecutionRecord::success(
                    cell_id,
                    sql,
                    duration_ms,
                    row_count as u64,
                ));

                tracing::info!(cell_id = %cell_id, row_count, duration_ms, "query execution completed");
                ExecutionOutcome::Succeeded {
                    row_count,
                    duration_ms,
                }
            }
            Err(e) if e.is_cancelled() => {
                entry.cell.reset_idle();
                tracing::debug!(cell_id = %cell_id, "backend reported cancellation, cell back to Idle");
                ExecutionOutcome::Cancelled
            }
            Err(e) => {
                let message = e.user_message();
                self.release(cell_id);
                entry.cell.fail(message.clone(), duration_ms);
                self.history.write().record(ExecutionRecord::failure(
                    cell_id,
                    sql,
                    duration_ms,
                    message.clone(),
                ));

                tracing::warn!(cell_id = %cell_id, error = %message, duration_ms, "query execution failed");
                ExecutionOutcome::Failed {
                    message,
                    duration_ms,
                }
            }
        }
    }
}
