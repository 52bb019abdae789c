//! Workbench session: the ordered set of cells and the active-cell pointer
//!
//! Every cell action is dispatched to the [`CellExecutionCoordinator`]; the
//! session adds ordering, focus, schema-driven query generation and the
//! statistics panel selection.

use std::sync::Arc;
use swiftquery_core::{CellId, ObjectKind, QueryBackend, SchemaTree};
use swiftquery_query::{
    CellExecutionCoordinator, ColumnStatistics, ExecutionOutcome, ExecutionRecord,
    ExecutionTicket, FilterCondition, FilterDraft, PageNavigation, PageSlice, QueryCell,
    WorkbenchError, WorkbenchResult, sql,
};

use crate::error::ServiceResult;
use crate::schema_service::SchemaService;
use crate::settings::WorkbenchSettings;
use crate::view_models::{CellView, PageView, SessionView};

/// Aggregate root for one workbench window.
///
/// Running a cell spawns a tokio task: `start_cell`, `run_cell`,
/// `run_active_cell` and `apply_filters` must be called from within a tokio
/// runtime, and `start_cell` panics outside one.
pub struct WorkbenchSession {
    coordinator: CellExecutionCoordinator,
    schema: SchemaService,
    settings: WorkbenchSettings,
    /// Display order
    cells: Vec<CellId>,
    active_cell_id: Option<CellId>,
    /// Cell and column last shown in the statistics panel
    selected_statistics: Option<(CellId, String)>,
}

impl WorkbenchSession {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_settings(backend, WorkbenchSettings::default())
    }

    pub fn with_settings(backend: Arc<dyn QueryBackend>, settings: WorkbenchSettings) -> Self {
        let settings = settings.normalized();
        let coordinator =
            CellExecutionCoordinator::with_config(backend.clone(), settings.coordinator_config());
        let schema = SchemaService::with_ttl(backend, settings.schema_cache_ttl());
        Self {
            coordinator,
            schema,
            settings,
            cells: Vec::new(),
            active_cell_id: None,
            selected_statistics: None,
        }
    }

    pub fn coordinator(&self) -> &CellExecutionCoordinator {
        &self.coordinator
    }

    pub fn settings(&self) -> &WorkbenchSettings {
        &self.settings
    }

    /// Append a new idle cell and make it active
    pub fn add_cell(&mut self) -> CellId {
        let id = self.coordinator.create_cell();
        self.cells.push(id);
        self.active_cell_id = Some(id);
        tracing::debug!(cell_id = %id, cells = self.cells.len(), "added cell");
        id
    }

    /// Delete a cell, cancelling any execution and releasing its result.
    ///
    /// If it was active, focus moves to the preceding cell, else to the new
    /// last cell, else to nothing.
    pub fn delete_cell(&mut self, cell_id: CellId) -> WorkbenchResult<()> {
        let index = self
            .position(cell_id)
            .ok_or(WorkbenchError::CellNotFound(cell_id))?;
        self.coordinator.remove(cell_id)?;
        self.cells.remove(index);

        if self.active_cell_id == Some(cell_id) {
            self.active_cell_id = match index.checked_sub(1) {
                Some(previous) => self.cells.get(previous).copied(),
                None => self.cells.last().copied(),
            };
        }
        if self
            .selected_statistics
            .as_ref()
            .is_some_and(|(id, _)| *id == cell_id)
        {
            self.selected_statistics = None;
        }

        tracing::debug!(
            cell_id = %cell_id,
            active_cell_id = ?self.active_cell_id,
            "deleted cell"
        );
        Ok(())
    }

    pub fn focus_cell(&mut self, cell_id: CellId) -> WorkbenchResult<()> {
        if self.position(cell_id).is_none() {
            return Err(WorkbenchError::CellNotFound(cell_id));
        }
        self.active_cell_id = Some(cell_id);
        Ok(())
    }

    pub fn set_query_text(&self, cell_id: CellId, text: impl Into<String>) -> WorkbenchResult<()> {
        self.coordinator.set_query_text(cell_id, text)
    }

    /// Start a cell without waiting for it. Requires an ambient tokio runtime.
    pub fn start_cell(&self, cell_id: CellId) -> WorkbenchResult<ExecutionTicket> {
        self.coordinator.start(cell_id)
    }

    pub async fn run_cell(&self, cell_id: CellId) -> WorkbenchResult<ExecutionOutcome> {
        self.coordinator.run(cell_id).await
    }

    pub async fn run_active_cell(&self) -> WorkbenchResult<ExecutionOutcome> {
        let cell_id = self.require_active_cell()?;
        self.run_cell(cell_id).await
    }

    pub fn cancel_cell(&self, cell_id: CellId) -> WorkbenchResult<bool> {
        self.coordinator.cancel(cell_id)
    }

    /// Open the filter editor for a cell, pre-populated with its active filters
    pub fn filter_draft(&self, cell_id: CellId) -> WorkbenchResult<FilterDraft> {
        let cell = self
            .coordinator
            .cell(cell_id)
            .ok_or(WorkbenchError::CellNotFound(cell_id))?;
        if !cell.filter_enabled() {
            return Err(WorkbenchError::FiltersUnavailable(cell_id));
        }
        let result = self
            .coordinator
            .result_set(cell_id)
            .ok_or(WorkbenchError::NoResultSet(cell_id))?;
        FilterDraft::with_conditions(result.columns.clone(), cell.active_filters().to_vec())
            .ok_or(WorkbenchError::FiltersUnavailable(cell_id))
    }

    /// Apply filters and wait for the filtered re-execution
    pub async fn apply_filters(
        &self,
        cell_id: CellId,
        conditions: Vec<FilterCondition>,
    ) -> WorkbenchResult<ExecutionOutcome> {
        self.coordinator
            .apply_filters(cell_id, conditions)?
            .wait()
            .await
    }

    pub fn clear_filters(&self, cell_id: CellId) -> WorkbenchResult<()> {
        self.coordinator.clear_filters(cell_id)
    }

    /// Compute statistics for a column header click and select them for
    /// the statistics panel
    pub fn column_statistics(
        &mut self,
        cell_id: CellId,
        column: &str,
    ) -> WorkbenchResult<ColumnStatistics> {
        match self.coordinator.column_statistics(cell_id, column) {
            Ok(stats) => {
                self.selected_statistics = Some((cell_id, column.to_string()));
                Ok(stats)
            }
            Err(e) => {
                tracing::warn!(cell_id = %cell_id, column, error = %e, "cannot calculate statistics");
                self.selected_statistics = None;
                Err(e)
            }
        }
    }

    /// Statistics shown in the panel; gone once the cell re-runs or is deleted
    pub fn selected_statistics(&self) -> Option<ColumnStatistics> {
        let (cell_id, column) = self.selected_statistics.as_ref()?;
        self.coordinator.cached_statistics(*cell_id, column)
    }

    /// Write the preview query for a table or view into the active cell
    pub fn select_schema_object(
        &self,
        schema: &str,
        name: &str,
        kind: ObjectKind,
    ) -> WorkbenchResult<String> {
        let cell_id = self.require_active_cell()?;
        let query = sql::select_for_object(
            schema,
            name,
            &self.settings.schema.default_schema,
            self.settings.schema.generated_query_limit,
        );
        self.coordinator.set_query_text(cell_id, query.clone())?;
        tracing::debug!(cell_id = %cell_id, schema, name, %kind, "generated query for schema object");
        Ok(query)
    }

    pub async fn go_to_page(&self, cell_id: CellId, page: u32) -> WorkbenchResult<PageSlice> {
        self.coordinator.go_to_page(cell_id, page).await
    }

    pub async fn navigate_page(
        &self,
        cell_id: CellId,
        navigation: PageNavigation,
    ) -> WorkbenchResult<Option<PageSlice>> {
        self.coordinator.navigate_page(cell_id, navigation).await
    }

    pub async fn load_schema(&self) -> ServiceResult<Arc<SchemaTree>> {
        self.schema.load().await
    }

    pub async fn refresh_schema(&self) -> ServiceResult<Arc<SchemaTree>> {
        self.schema.refresh().await
    }

    pub fn schema_service(&self) -> &SchemaService {
        &self.schema
    }

    /// Cells in display order
    pub fn cells(&self) -> Vec<QueryCell> {
        self.cells
            .iter()
            .filter_map(|id| self.coordinator.cell(*id))
            .collect()
    }

    pub fn cell_ids(&self) -> &[CellId] {
        &self.cells
    }

    pub fn active_cell_id(&self) -> Option<CellId> {
        self.active_cell_id
    }

    /// Execution history, most recent first
    pub fn history(&self) -> Vec<ExecutionRecord> {
        self.coordinator.history().read().records().cloned().collect()
    }

    pub fn snapshot(&self) -> SessionView {
        let cells = self
            .cells
            .iter()
            .filter_map(|id| {
                let cell = self.coordinator.cell(*id)?;
                let result = self.coordinator.result_set(*id);
                let page = self
                    .coordinator
                    .pagination_state(*id)
                    .zip(self.coordinator.current_page(*id))
                    .map(|(state, slice)| PageView::new(&state, &slice));
                Some(CellView::new(
                    &cell,
                    result.as_deref(),
                    page,
                    self.active_cell_id == Some(*id),
                ))
            })
            .collect();
        let last_query_time_ms = self
            .coordinator
            .history()
            .read()
            .latest()
            .map(|record| record.duration_ms);

        SessionView {
            cells,
            active_cell_id: self.active_cell_id,
            last_query_time_ms,
        }
    }

    fn position(&self, cell_id: CellId) -> Option<usize> {
        self.cells.iter().position(|id| *id == cell_id)
    }

    fn require_active_cell(&self) -> WorkbenchResult<CellId> {
        self.active_cell_id.ok_or_else(|| {
            tracing::warn!("no active cell");
            WorkbenchError::NoActiveCell
        })
    }
}
