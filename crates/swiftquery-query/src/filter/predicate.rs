use super::operator::FilterOperator;
use crate::error::{WorkbenchError, WorkbenchResult};
use crate::sql::{like_pattern, quote_identifier, quote_literal};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use swiftquery_core::{Record, ResultSet, Value};

/// One column/operator/value row of a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl FilterCondition {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Condition for an operator that takes no value
    pub fn nullary(column: impl Into<String>, operator: FilterOperator) -> Self {
        Self::new(column, operator, String::new())
    }

    fn list_items(&self) -> Vec<&str> {
        self.value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    }

    fn has_value(&self) -> bool {
        if self.operator.is_list() {
            !self.list_items().is_empty()
        } else {
            !self.value.trim().is_empty()
        }
    }

    /// Render the condition as a SQL boolean expression
    pub fn to_sql(&self) -> String {
        let col = quote_identifier(&self.column);
        let value = self.value.as_str();

        match self.operator {
            FilterOperator::Contains => format!("{} LIKE {} ESCAPE '\\'", col, like_pattern("%", value, "%")),
            FilterOperator::DoesNotContain => {
                format!("{} NOT LIKE {} ESCAPE '\\'", col, like_pattern("%", value, "%"))
            }
            FilterOperator::StartsWith => format!("{} LIKE {} ESCAPE '\\'", col, like_pattern("", value, "%")),
            FilterOperator::EndsWith => format!("{} LIKE {} ESCAPE '\\'", col, like_pattern("%", value, "")),
            FilterOperator::Equal => format!("{} = {}", col, quote_literal(value)),
            FilterOperator::NotEqual => format!("{} <> {}", col, quote_literal(value)),
            FilterOperator::GreaterThan => format!("{} > {}", col, quote_literal(value)),
            FilterOperator::GreaterThanOrEqual => format!("{} >= {}", col, quote_literal(value)),
            FilterOperator::LessThan => format!("{} < {}", col, quote_literal(value)),
            FilterOperator::LessThanOrEqual => format!("{} <= {}", col, quote_literal(value)),
            FilterOperator::IsNull => format!("{} IS NULL", col),
            FilterOperator::IsNotNull => format!("{} IS NOT NULL", col),
            FilterOperator::In | FilterOperator::NotIn => {
                let items: Vec<String> = self.list_items().into_iter().map(quote_literal).collect();
                let keyword = if self.operator == FilterOperator::In { "IN" } else { "NOT IN" };
                format!("{} {} ({})", col, keyword, items.join(", "))
            }
        }
    }

    /// Evaluate the condition against one record.
    ///
    /// NULL (or a missing column) satisfies only `is_null`. Text matching
    /// is case-insensitive; comparisons are numeric when both sides parse
    /// as numbers.
    pub fn matches(&self, record: &Record) -> bool {
        let cell = record.get(&self.column).filter(|v| !v.is_null());

        let Some(cell) = cell else {
            return self.operator == FilterOperator::IsNull;
        };

        let text = cell.to_string().to_lowercase();
        let needle = self.value.to_lowercase();

        match self.operator {
            FilterOperator::IsNull => false,
            FilterOperator::IsNotNull => true,
            FilterOperator::Contains => text.contains(&needle),
            FilterOperator::DoesNotContain => !text.contains(&needle),
            FilterOperator::StartsWith => text.starts_with(&needle),
            FilterOperator::EndsWith => text.ends_with(&needle),
            FilterOperator::Equal => values_equal(cell, &self.value),
            FilterOperator::NotEqual => !values_equal(cell, &self.value),
            FilterOperator::GreaterThan => numeric_or_string_cmp(cell, &self.value) == Ordering::Greater,
            FilterOperator::GreaterThanOrEqual => {
                numeric_or_string_cmp(cell, &self.value) != Ordering::Less
            }
            FilterOperator::LessThan => numeric_or_string_cmp(cell, &self.value) == Ordering::Less,
            FilterOperator::LessThanOrEqual => {
                numeric_or_string_cmp(cell, &self.value) != Ordering::Greater
            }
            FilterOperator::In => self.list_items().iter().any(|item| values_equal(cell, item)),
            FilterOperator::NotIn => !self.list_items().iter().any(|item| values_equal(cell, item)),
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn values_equal(cell: &Value, value: &str) -> bool {
    match (cell.as_f64_coerced(), parse_number(value)) {
        (Some(a), Some(b)) => a == b,
        _ => cell.to_string().to_lowercase() == value.trim().to_lowercase(),
    }
}

fn numeric_or_string_cmp(cell: &Value, value: &str) -> Ordering {
    match (cell.as_f64_coerced(), parse_number(value)) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => cell
            .to_string()
            .to_lowercase()
            .cmp(&value.trim().to_lowercase()),
    }
}

/// Check that every value-taking condition has a value
pub fn validate(conditions: &[FilterCondition]) -> WorkbenchResult<()> {
    match conditions
        .iter()
        .find(|c| c.operator.requires_value() && !c.has_value())
    {
        Some(c) => Err(WorkbenchError::MissingValue {
            column: c.column.clone(),
            operator: c.operator.label().to_string(),
        }),
        None => Ok(()),
    }
}

/// Check that every condition references one of `columns`
pub fn validate_columns(conditions: &[FilterCondition], columns: &[String]) -> WorkbenchResult<()> {
    match conditions
        .iter()
        .find(|c| !columns.iter().any(|col| col == &c.column))
    {
        Some(c) => Err(WorkbenchError::InvalidColumn(c.column.clone())),
        None => Ok(()),
    }
}

/// Validate and compile conditions into a predicate (logical AND)
pub fn compile(conditions: &[FilterCondition]) -> WorkbenchResult<Predicate> {
    validate(conditions)?;
    Ok(Predicate {
        conditions: conditions.to_vec(),
    })
}

/// Compiled filter: usable locally on records or rendered as a WHERE clause.
///
/// With no conditions it is the identity predicate: every record matches
/// and there is no WHERE clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    conditions: Vec<FilterCondition>,
}

impl Predicate {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// Apply the predicate to a result set, keeping its columns
    pub fn filter(&self, result: &ResultSet) -> ResultSet {
        let rows = result
            .rows
            .iter()
            .filter(|row| self.matches(row))
            .cloned()
            .collect();
        ResultSet::with_columns(result.columns.clone(), rows).with_page_size(result.page_size)
    }

    pub fn where_clause(&self) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        Some(
            self.conditions
                .iter()
                .map(FilterCondition::to_sql)
                .collect::<Vec<_>>()
                .join(" AND "),
        )
    }
}
