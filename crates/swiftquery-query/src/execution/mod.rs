//! Cell execution coordinator
//!
//! Runs query cells against the backend, one inflight execution per cell,
//! and publishes each outcome to the result cache, pagination and
//! statistics.

mod coordinator;
#[cfg(test)]
mod tests;

pub use coordinator::{
    CellExecutionCoordinator, CoordinatorConfig, ExecutionOutcome, ExecutionTicket,
};
