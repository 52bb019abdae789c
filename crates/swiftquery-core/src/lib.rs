//! SwiftQuery Core - Core abstractions for the query workbench
//!
//! This crate provides the fundamental types and traits that all other
//! SwiftQuery crates depend on. It defines:
//!
//! - `QueryBackend` - The pluggable execution capability (execute, page, schema)
//! - `ResultSet`, `Record`, `Value` - The materialized result model
//! - `SchemaTree` - Hierarchical schema metadata for the browser
//! - `CellId` - Stable identifier of a query cell

mod backend;
mod error;
mod schema;
mod types;

pub use backend::*;
pub use error::*;
pub use schema::*;
pub use types::*;

pub use tokio_util::sync::CancellationToken;
