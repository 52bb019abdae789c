//! Filter predicate compiler
//!
//! Turns column/operator/value conditions into a [`Predicate`] that can be
//! evaluated against cached records or rendered into a WHERE clause for
//! re-execution. [`FilterDraft`] models the editing dialog on top of it.

mod draft;
mod operator;
mod predicate;

pub use draft::FilterDraft;
pub use operator::{FilterOperator, UnknownOperator};
pub use predicate::{FilterCondition, Predicate, compile, validate, validate_columns};
