use super::operator::FilterOperator;
use super::predicate::{FilterCondition, validate, validate_columns};
use crate::error::{WorkbenchError, WorkbenchResult};

/// Editable list of filter rows backing the filter dialog.
///
/// Always holds at least one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDraft {
    columns: Vec<String>,
    conditions: Vec<FilterCondition>,
}

impl FilterDraft {
    /// Start a draft with one default row, or `None` when there are no
    /// columns to filter on
    pub fn new(columns: Vec<String>) -> Option<Self> {
        let first = columns.first()?.clone();
        Some(Self {
            columns,
            conditions: vec![FilterCondition::new(first, FilterOperator::default(), "")],
        })
    }

    /// Start a draft pre-populated with existing conditions
    pub fn with_conditions(columns: Vec<String>, conditions: Vec<FilterCondition>) -> Option<Self> {
        let mut draft = Self::new(columns)?;
        if !conditions.is_empty() {
            draft.conditions = conditions;
        }
        Some(draft)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    fn default_row(&self) -> FilterCondition {
        let column = self.columns.first().cloned().unwrap_or_default();
        FilterCondition::new(column, FilterOperator::default(), "")
    }

    /// Append a default row
    pub fn add_condition(&mut self) {
        let row = self.default_row();
        self.conditions.push(row);
    }

    fn row_mut(&mut self, index: usize) -> WorkbenchResult<&mut FilterCondition> {
        let rows = self.conditions.len();
        self.conditions
            .get_mut(index)
            .ok_or(WorkbenchError::FilterRowOutOfRange { index, rows })
    }

    /// Remove a row; the last remaining row cannot be removed
    pub fn remove_condition(&mut self, index: usize) -> WorkbenchResult<()> {
        self.row_mut(index)?;
        if self.conditions.len() <= 1 {
            return Err(WorkbenchError::LastFilterCondition);
        }
        self.conditions.remove(index);
        Ok(())
    }

    pub fn set_column(&mut self, index: usize, column: impl Into<String>) -> WorkbenchResult<()> {
        let column = column.into();
        if !self.columns.contains(&column) {
            return Err(WorkbenchError::InvalidColumn(column));
        }
        self.row_mut(index)?.column = column;
        Ok(())
    }

    /// Change a row's operator, clearing its value when the operator takes none
    pub fn set_operator(&mut self, index: usize, operator: FilterOperator) -> WorkbenchResult<()> {
        let row = self.row_mut(index)?;
        row.operator = operator;
        if !operator.requires_value() {
            row.value.clear();
        }
        Ok(())
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<String>) -> WorkbenchResult<()> {
        self.row_mut(index)?.value = value.into();
        Ok(())
    }

    /// Reset to a single default row
    pub fn clear_all(&mut self) {
        self.conditions = vec![self.default_row()];
    }

    pub fn validate(&self) -> WorkbenchResult<()> {
        validate_columns(&self.conditions, &self.columns)?;
        validate(&self.conditions)
    }

    pub fn into_conditions(self) -> Vec<FilterCondition> {
        self.conditions
    }
}
