use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Filter operators offered by the filter dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    // String operators
    #[default]
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does_not_contain")]
    DoesNotContain,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,

    // Comparison operators
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<>")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,

    // NULL operators
    #[serde(rename = "is_null")]
    IsNull,
    #[serde(rename = "is_not_null")]
    IsNotNull,

    // List operators
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
}

impl FilterOperator {
    /// Stable symbol used for serialization and parsing
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::DoesNotContain => "does_not_contain",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::In => "in",
            Self::NotIn => "not_in",
        }
    }

    /// Get the display label for the operator
    pub fn label(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::DoesNotContain => "does not contain",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
            Self::In => "in (comma-sep)",
            Self::NotIn => "not in (comma-sep)",
        }
    }

    /// Returns true if this operator requires a value input
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Returns true if the value is a comma-separated list
    pub fn is_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Get all available operators in display order
    pub fn all() -> &'static [FilterOperator] {
        &[
            Self::Contains,
            Self::DoesNotContain,
            Self::StartsWith,
            Self::EndsWith,
            Self::Equal,
            Self::NotEqual,
            Self::GreaterThan,
            Self::GreaterThanOrEqual,
            Self::LessThan,
            Self::LessThanOrEqual,
            Self::IsNull,
            Self::IsNotNull,
            Self::In,
            Self::NotIn,
        ]
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown filter operator: {0}")]
pub struct UnknownOperator(pub String);

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|op| op.symbol() == s || op.label() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}
