//! Tests for the cell execution coordinator.

use super::*;
use crate::cell::ExecutionState;
use crate::error::WorkbenchError;
use crate::filter::{FilterCondition, FilterOperator};
use crate::pagination::PageNavigation;
use crate::test_helpers::{StubBackend, StubResponse, customers};
use std::sync::Arc;
use swiftquery_core::{CellId, ResultSet, Value};

fn coordinator(backend: &Arc<StubBackend>) -> CellExecutionCoordinator {
    CellExecutionCoordinator::new(backend.clone())
}

fn cell_with_query(coordinator: &CellExecutionCoordinator, sql: &str) -> CellId {
    let id = coordinator.create_cell();
    coordinator.set_query_text(id, sql).unwrap();
    id
}

mod run_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_run_publishes_result() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(10)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");

        let outcome = coordinator.run(id).await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Succeeded { row_count: 10, .. }));
        let cell = coordinator.cell(id).unwrap();
        assert_eq!(cell.execution_state(), ExecutionState::Succeeded);
        assert_eq!(cell.row_count(), 10);
        assert!(cell.filter_enabled());
        assert!(cell.result_handle().is_some());
        assert!(cell.last_duration_ms().is_some());
        assert_eq!(coordinator.result_set(id).unwrap().row_count(), 10);
        assert_eq!(coordinator.current_page(id).unwrap().rows.len(), 10);
        assert_eq!(coordinator.history().read().len(), 1);
    }

    #[tokio::test]
    async fn test_status_result_disables_filtering() {
        let backend = StubBackend::new();
        backend.respond("UPDATE", StubResponse::Rows(ResultSet::status("1 row affected.")));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "UPDATE t SET a = 1");

        coordinator.run(id).await.unwrap();

        let cell = coordinator.cell(id).unwrap();
        assert_eq!(cell.row_count(), 1);
        assert!(!cell.filter_enabled());
    }

    #[tokio::test]
    async fn test_failure_records_error_verbatim() {
        let backend = StubBackend::new();
        backend.respond("orders", StubResponse::Error("no such table: orders".into()));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM orders");

        let outcome = coordinator.run(id).await.unwrap();

        let cell = coordinator.cell(id).unwrap();
        assert_eq!(cell.execution_state(), ExecutionState::Failed);
        assert_eq!(cell.last_error().unwrap().message, "no such table: orders");
        assert_eq!(cell.row_count(), 0);
        assert!(coordinator.result_set(id).is_none());
        assert!(matches!(
            outcome.into_result(),
            Err(WorkbenchError::ExecutionFailed(m)) if m == "no such table: orders"
        ));
        assert!(!coordinator.history().read().latest().unwrap().succeeded());
    }

    #[tokio::test]
    async fn test_failure_drops_previous_result() {
        let backend = StubBackend::new();
        backend.respond("broken", StubResponse::Error("syntax error".into()));
        backend.respond("customers", StubResponse::Rows(customers(3)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        coordinator.set_query_text(id, "SELECT broken").unwrap();
        coordinator.run(id).await.unwrap();

        assert!(coordinator.result_set(id).is_none());
        assert!(coordinator.current_page(id).is_none());
    }

    #[tokio::test]
    async fn test_backend_cancellation_returns_to_idle() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Cancelled);
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");

        let outcome = coordinator.run(id).await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Cancelled);
        let cell = coordinator.cell(id).unwrap();
        assert_eq!(cell.execution_state(), ExecutionState::Idle);
        assert!(cell.last_error().is_none());
        assert!(coordinator.result_set(id).is_none());
        assert!(coordinator.history().read().is_empty());
        assert!(matches!(outcome.into_result(), Err(WorkbenchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_timeout_is_an_ordinary_failure() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Timeout("query exceeded 30s".into()));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");

        let outcome = coordinator.run(id).await.unwrap();

        let cell = coordinator.cell(id).unwrap();
        assert_eq!(cell.execution_state(), ExecutionState::Failed);
        assert_eq!(cell.last_error().unwrap().message, "Timeout: query exceeded 30s");
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed { ref message, .. } if message == "Timeout: query exceeded 30s"
        ));
        let history = coordinator.history();
        let history = history.read();
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().error(), Some("Timeout: query exceeded 30s"));
    }

    #[tokio::test]
    async fn test_blank_query_succeeds_without_backend() {
        let backend = StubBackend::new();
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "   ");

        let outcome = coordinator.run(id).await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Succeeded { row_count: 0, .. }));
        assert!(!coordinator.cell(id).unwrap().filter_enabled());
        assert!(backend.executed().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_cell() {
        let backend = StubBackend::new();
        let coordinator = coordinator(&backend);

        assert!(matches!(
            coordinator.start(CellId::new()),
            Err(WorkbenchError::CellNotFound(_))
        ));
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_second_start_while_running_is_rejected() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(2)));
        let gate = backend.hold("customers");
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");

        let ticket = coordinator.start(id).unwrap();
        let err = coordinator.start(id).unwrap_err();

        assert!(matches!(err, WorkbenchError::AlreadyRunning(c) if c == id));
        assert_eq!(coordinator.execution_state(id), Some(ExecutionState::Running));

        gate.release();
        assert!(matches!(
            ticket.wait().await.unwrap(),
            ExecutionOutcome::Succeeded { row_count: 2, .. }
        ));
        assert_eq!(backend.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_returns_to_idle_and_discards_completion() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(2)));
        let _gate = backend.hold("customers");
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");

        let ticket = coordinator.start(id).unwrap();
        assert!(coordinator.cancel(id).unwrap());

        let cell = coordinator.cell(id).unwrap();
        assert_eq!(cell.execution_state(), ExecutionState::Idle);
        assert!(cell.last_error().is_none());
        assert_eq!(ticket.wait().await.unwrap(), ExecutionOutcome::Discarded);
        assert!(coordinator.result_set(id).is_none());
        assert!(coordinator.history().read().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let backend = StubBackend::new();
        let coordinator = coordinator(&backend);
        let id = coordinator.create_cell();

        assert!(!coordinator.cancel(id).unwrap());
    }

    #[tokio::test]
    async fn test_rerun_after_cancel_applies_only_latest() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(4)));
        let gate = backend.hold("customers");
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");

        let first = coordinator.start(id).unwrap();
        coordinator.cancel(id).unwrap();
        let second = coordinator.start(id).unwrap();
        assert!(second.epoch() > first.epoch());

        gate.release();
        assert_eq!(first.wait().await.unwrap(), ExecutionOutcome::Discarded);
        assert!(matches!(
            second.wait().await.unwrap(),
            ExecutionOutcome::Succeeded { row_count: 4, .. }
        ));
        assert_eq!(coordinator.history().read().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_running_cell_releases_everything() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(3)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();
        coordinator.column_statistics(id, "id").unwrap();

        let gate = backend.hold("customers");
        let ticket = coordinator.start(id).unwrap();
        coordinator.remove(id).unwrap();
        gate.release();

        assert_eq!(ticket.wait().await.unwrap(), ExecutionOutcome::Discarded);
        assert!(!coordinator.contains(id));
        assert!(coordinator.result_set(id).is_none());
        assert!(coordinator.cached_statistics(id, "id").is_none());
        assert!(coordinator.current_page(id).is_none());
    }

    #[tokio::test]
    async fn test_editing_running_cell_does_not_cancel() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(2)));
        let gate = backend.hold("customers");
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");

        let ticket = coordinator.start(id).unwrap();
        coordinator.set_query_text(id, "SELECT 1").unwrap();
        gate.release();

        assert!(matches!(ticket.wait().await.unwrap(), ExecutionOutcome::Succeeded { .. }));
        assert_eq!(coordinator.cell(id).unwrap().query_text(), "SELECT 1");
    }

    #[tokio::test]
    async fn test_other_cells_proceed_while_one_is_held() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(2)));
        backend.respond("products", StubResponse::Rows(customers(5)));
        let gate = backend.hold("customers");
        let coordinator = coordinator(&backend);
        let slow = cell_with_query(&coordinator, "SELECT * FROM customers");
        let fast = cell_with_query(&coordinator, "SELECT * FROM products");

        let slow_ticket = coordinator.start(slow).unwrap();
        let outcome = coordinator.run(fast).await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Succeeded { row_count: 5, .. }));
        assert_eq!(coordinator.execution_state(slow), Some(ExecutionState::Running));

        gate.release();
        slow_ticket.wait().await.unwrap();
        assert_eq!(coordinator.execution_state(slow), Some(ExecutionState::Succeeded));
    }

    #[tokio::test]
    async fn test_rerun_invalidates_result_and_statistics() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(3)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();
        coordinator.column_statistics(id, "name").unwrap();

        let gate = backend.hold("customers");
        let ticket = coordinator.start(id).unwrap();

        assert!(coordinator.cached_statistics(id, "name").is_none());
        assert!(matches!(
            coordinator.column_statistics(id, "name"),
            Err(WorkbenchError::NoResultSet(_))
        ));
        assert!(coordinator.cell(id).unwrap().result_handle().is_none());

        gate.release();
        ticket.wait().await.unwrap();
    }
}

mod filter_tests {
    use super::*;

    fn name_contains(value: &str) -> Vec<FilterCondition> {
        vec![FilterCondition::new("name", FilterOperator::Contains, value)]
    }

    #[tokio::test]
    async fn test_apply_filters_reexecutes_with_where_clause() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(3)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers;");
        coordinator.run(id).await.unwrap();

        let ticket = coordinator.apply_filters(id, name_contains("1")).unwrap();
        ticket.wait().await.unwrap();

        assert_eq!(
            backend.executed().last().unwrap(),
            "SELECT * FROM (\nSELECT * FROM customers\n) AS filtered_result WHERE \"name\" LIKE '%1%' ESCAPE '\\'"
        );
        let cell = coordinator.cell(id).unwrap();
        assert_eq!(cell.active_filters(), name_contains("1").as_slice());
        assert_eq!(cell.query_text(), "SELECT * FROM customers;");
    }

    #[tokio::test]
    async fn test_rerun_keeps_filters_in_request() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(3)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();
        coordinator.apply_filters(id, name_contains("2")).unwrap().wait().await.unwrap();

        coordinator.run(id).await.unwrap();

        assert!(backend.executed().last().unwrap().contains("filtered_result"));
    }

    #[tokio::test]
    async fn test_filters_on_vanished_columns_are_dropped() {
        let backend = StubBackend::new();
        let mut only_id = swiftquery_core::Record::new();
        only_id.insert("id".into(), Value::Int64(1));
        backend.respond("filtered_result", StubResponse::Rows(ResultSet::from_rows(vec![only_id])));
        backend.respond("customers", StubResponse::Rows(customers(3)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        coordinator.apply_filters(id, name_contains("1")).unwrap().wait().await.unwrap();

        assert!(coordinator.cell(id).unwrap().active_filters().is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors_leave_state_untouched() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(3)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        let missing = coordinator.apply_filters(id, name_contains(" ")).unwrap_err();
        let unknown = coordinator
            .apply_filters(id, vec![FilterCondition::new("email", FilterOperator::Equal, "x")])
            .unwrap_err();

        assert!(matches!(missing, WorkbenchError::MissingValue { .. }));
        assert!(matches!(unknown, WorkbenchError::InvalidColumn(c) if c == "email"));
        let cell = coordinator.cell(id).unwrap();
        assert_eq!(cell.execution_state(), ExecutionState::Succeeded);
        assert!(cell.active_filters().is_empty());
        assert_eq!(backend.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_filters_unavailable_for_status_results() {
        let backend = StubBackend::new();
        backend.respond("DELETE", StubResponse::Rows(ResultSet::status("3 rows affected.")));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "DELETE FROM t");
        coordinator.run(id).await.unwrap();

        let err = coordinator
            .apply_filters(id, vec![FilterCondition::nullary("status", FilterOperator::IsNull)])
            .unwrap_err();

        assert!(matches!(err, WorkbenchError::FiltersUnavailable(_)));
    }

    #[tokio::test]
    async fn test_preview_and_clear_filters() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(12)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        let preview = coordinator
            .preview_filters(id, &[FilterCondition::new("id", FilterOperator::GreaterThan, "10")])
            .unwrap();
        assert_eq!(preview.row_count(), 2);
        assert_eq!(backend.executed().len(), 1);

        coordinator.apply_filters(id, name_contains("1")).unwrap().wait().await.unwrap();
        coordinator.clear_filters(id).unwrap();
        assert!(coordinator.cell(id).unwrap().active_filters().is_empty());
    }

    #[tokio::test]
    async fn test_clear_filters_rejected_while_filtered_run_inflight() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(3)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();
        let gate = backend.hold("filtered_result");

        let ticket = coordinator.apply_filters(id, name_contains("1")).unwrap();
        let err = coordinator.clear_filters(id).unwrap_err();
        gate.release();
        ticket.wait().await.unwrap();

        assert!(matches!(err, WorkbenchError::AlreadyRunning(c) if c == id));
        assert_eq!(
            coordinator.cell(id).unwrap().active_filters(),
            name_contains("1").as_slice()
        );
        coordinator.clear_filters(id).unwrap();
        assert!(coordinator.cell(id).unwrap().active_filters().is_empty());
    }
}

mod statistics_tests {
    use super::*;

    #[tokio::test]
    async fn test_statistics_require_result() {
        let backend = StubBackend::new();
        let coordinator = coordinator(&backend);
        let id = coordinator.create_cell();

        assert!(matches!(
            coordinator.column_statistics(id, "name"),
            Err(WorkbenchError::NoResultSet(_))
        ));
    }

    #[tokio::test]
    async fn test_statistics_are_cached() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(10)));
        let coordinator = coordinator(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        let stats = coordinator.column_statistics(id, "id").unwrap();

        assert_eq!(stats.total_count, 10);
        assert_eq!(stats.sum(), Some(55.0));
        assert_eq!(coordinator.cached_statistics(id, "id"), Some(stats));
        assert!(matches!(
            coordinator.column_statistics(id, "nope"),
            Err(WorkbenchError::InvalidColumn(_))
        ));
    }
}

mod pagination_tests {
    use super::*;

    fn small_pages(backend: &Arc<StubBackend>) -> CellExecutionCoordinator {
        CellExecutionCoordinator::with_config(
            backend.clone(),
            CoordinatorConfig {
                page_size: 10,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_local_pages() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(25).with_total_rows_estimate(25)));
        let coordinator = small_pages(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        assert_eq!(coordinator.pagination_state(id).unwrap().total_pages(), 3);
        assert_eq!(coordinator.current_page(id).unwrap().display_range(), Some((1, 10)));

        let last = coordinator.go_to_page(id, 3).await.unwrap();
        assert_eq!(last.display_range(), Some((21, 25)));
        assert!(matches!(
            coordinator.go_to_page(id, 4).await,
            Err(WorkbenchError::OutOfRange { page: 4, total_pages: 3 })
        ));
        assert_eq!(coordinator.navigate_page(id, PageNavigation::Next).await.unwrap(), None);
        assert!(backend.page_requests().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_at_first_page_is_noop() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(25).with_total_rows_estimate(25)));
        let coordinator = small_pages(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        assert_eq!(coordinator.navigate_page(id, PageNavigation::Previous).await.unwrap(), None);
        assert_eq!(coordinator.navigate_page(id, PageNavigation::Page(1)).await.unwrap(), None);
        let next = coordinator.navigate_page(id, PageNavigation::Next).await.unwrap().unwrap();
        assert_eq!(next.page, 2);
    }

    #[tokio::test]
    async fn test_remote_page_fetch() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(10).with_total_rows_estimate(25)));
        backend.serve_pages_from(customers(25));
        let coordinator = small_pages(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        let page = coordinator.go_to_page(id, 2).await.unwrap();

        assert_eq!(page.rows[0]["id"], Value::Int64(11));
        assert_eq!(page.display_range(), Some((11, 20)));
        let requests = backend.page_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].sql, "SELECT * FROM customers");
        assert_eq!(coordinator.pagination_state(id).unwrap().current_page, 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_current_page() {
        let backend = StubBackend::new();
        backend.respond("customers", StubResponse::Rows(customers(10).with_total_rows_estimate(25)));
        let coordinator = small_pages(&backend);
        let id = cell_with_query(&coordinator, "SELECT * FROM customers");
        coordinator.run(id).await.unwrap();

        let err = coordinator.go_to_page(id, 2).await.unwrap_err();

        assert!(matches!(err, WorkbenchError::Backend(_)));
        assert_eq!(coordinator.pagination_state(id).unwrap().current_page, 1);
    }
}
