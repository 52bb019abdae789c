//! Pagination state per cell

use crate::error::{WorkbenchError, WorkbenchResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swiftquery_core::{CellId, Record, ResultSet};

/// UI navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNavigation {
    Previous,
    Next,
    Page(u32),
}

/// Paging position within a cell's result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    /// 1-based
    pub current_page: u32,
    pub page_size: usize,
    pub total_rows_estimate: Option<u64>,
}

impl PaginationState {
    pub fn for_result(result: &ResultSet) -> Self {
        Self {
            current_page: 1,
            page_size: result.page_size.max(1),
            total_rows_estimate: result.total_rows_estimate,
        }
    }

    /// `ceil(estimate / page_size)` (at least 1), or 1 without an estimate
    pub fn total_pages(&self) -> u32 {
        match self.total_rows_estimate {
            Some(total) => {
                let pages = total.div_ceil(self.page_size.max(1) as u64).max(1);
                u32::try_from(pages).unwrap_or(u32::MAX)
            }
            None => 1,
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.total_rows_estimate.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    /// Zero-based offset of the first row of `page`
    pub fn offset_of(&self, page: u32) -> usize {
        (page.saturating_sub(1) as usize).saturating_mul(self.page_size)
    }

    fn check(&self, page: u32) -> WorkbenchResult<()> {
        let total_pages = self.total_pages();
        if page < 1 || page > total_pages {
            return Err(WorkbenchError::OutOfRange { page, total_pages });
        }
        Ok(())
    }

    /// Cut `page` out of locally cached rows, if they cover it entirely
    pub fn local_slice(&self, result: &ResultSet, page: u32) -> Option<PageSlice> {
        if !self.is_paginated() {
            return (page == 1).then(|| PageSlice::new(page, 0, result.rows.clone()));
        }
        let offset = self.offset_of(page);
        let page_end = offset.saturating_add(self.page_size);
        let expected_end = self
            .total_rows_estimate
            .map(|total| page_end.min(usize::try_from(total).unwrap_or(usize::MAX)))
            .unwrap_or(page_end);
        (result.rows.len() >= expected_end)
            .then(|| PageSlice::new(page, offset, result.slice(offset, self.page_size)))
    }
}

/// Rows displayed for one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice {
    pub page: u32,
    /// Zero-based index of the first row within the full result
    pub first_row: usize,
    pub rows: Vec<Record>,
}

impl PageSlice {
    pub fn new(page: u32, first_row: usize, rows: Vec<Record>) -> Self {
        Self {
            page,
            first_row,
            rows,
        }
    }

    /// 1-based inclusive row range for "Displaying rows X - Y", `None` when empty
    pub fn display_range(&self) -> Option<(usize, usize)> {
        if self.rows.is_empty() {
            return None;
        }
        Some((self.first_row + 1, self.first_row + self.rows.len()))
    }
}

struct CellPages {
    state: PaginationState,
    slice: PageSlice,
}

/// Tracks the current page of every cell with a result
#[derive(Default)]
pub struct PaginationController {
    cells: RwLock<HashMap<CellId, CellPages>>,
}

impl PaginationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at page 1 of a fresh result
    pub fn reset(&self, cell_id: CellId, result: &ResultSet) -> PageSlice {
        let state = PaginationState::for_result(result);
        let slice = if state.is_paginated() {
            PageSlice::new(1, 0, result.slice(0, state.page_size))
        } else {
            PageSlice::new(1, 0, result.rows.clone())
        };
        tracing::debug!(
            cell_id = %cell_id,
            total_pages = state.total_pages(),
            page_size = state.page_size,
            "pagination reset"
        );
        self.cells.write().insert(
            cell_id,
            CellPages {
                state,
                slice: slice.clone(),
            },
        );
        slice
    }

    pub fn state(&self, cell_id: CellId) -> Option<PaginationState> {
        self.cells.read().get(&cell_id).map(|p| p.state)
    }

    pub fn current_slice(&self, cell_id: CellId) -> Option<PageSlice> {
        self.cells.read().get(&cell_id).map(|p| p.slice.clone())
    }

    /// Validate a direct page request.
    ///
    /// Fails with `OutOfRange` when `page` is outside `1..=total_pages`.
    pub fn check_page(&self, cell_id: CellId, page: u32) -> WorkbenchResult<PaginationState> {
        let state = self
            .state(cell_id)
            .ok_or(WorkbenchError::NoResultSet(cell_id))?;
        state.check(page)?;
        Ok(state)
    }

    /// Resolve a UI navigation to a target page.
    ///
    /// Returns `None` when the request is a no-op: already on the first or
    /// last page, already on the requested page, or outside the range.
    pub fn navigate(&self, cell_id: CellId, navigation: PageNavigation) -> Option<u32> {
        let state = self.state(cell_id)?;
        let target = match navigation {
            PageNavigation::Previous if state.has_previous() => state.current_page - 1,
            PageNavigation::Next if state.has_next() => state.current_page + 1,
            PageNavigation::Page(page) if page != state.current_page && state.check(page).is_ok() => page,
            _ => {
                tracing::trace!(cell_id = %cell_id, ?navigation, "page navigation is a no-op");
                return None;
            }
        };
        Some(target)
    }

    /// Make `slice` the displayed page
    pub fn commit(&self, cell_id: CellId, slice: PageSlice) {
        if let Some(pages) = self.cells.write().get_mut(&cell_id) {
            pages.state.current_page = slice.page;
            pages.slice = slice;
        }
    }

    pub fn remove(&self, cell_id: CellId) {
        self.cells.write().remove(&cell_id);
    }
}
