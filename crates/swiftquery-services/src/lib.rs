//! SwiftQuery Services Layer
//!
//! This crate sits between the UI and the execution core. The UI drives a
//! [`WorkbenchSession`] and renders the view models it returns.
//!
//! # Architecture
//!
//! ```text
//! UI Layer
//!     ↓
//! Service Layer (swiftquery-services) ← This crate
//!     ↓
//! Execution Layer (swiftquery-query)
//!     ↓
//! Core (swiftquery-core) + a QueryBackend implementation
//! ```
//!
//! # Services
//!
//! - [`WorkbenchSession`] - Cells, focus, and dispatch of every cell action
//! - [`SchemaService`] - Schema tree loading with caching
//! - [`WorkbenchSettings`] - Persisted settings
//! - [`logging`] - Tracing subscriber setup

mod error;
pub mod logging;
mod schema_service;
mod settings;
mod view_models;
mod workbench_session;

pub use error::{ServiceError, ServiceResult};
pub use schema_service::SchemaService;
pub use settings::{ExecutionSettings, SchemaSettings, WorkbenchSettings};
pub use view_models::{CellView, PageView, SessionView};
pub use workbench_session::WorkbenchSession;
