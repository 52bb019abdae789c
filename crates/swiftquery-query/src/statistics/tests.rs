//! Tests for the statistics module.

use super::engine::*;
use crate::error::WorkbenchError;
use swiftquery_core::{CellId, Record, ResultSet, Value};

fn column(name: &str, values: Vec<Value>) -> ResultSet {
    let rows = values
        .into_iter()
        .map(|v| {
            let mut record = Record::new();
            record.insert(name.to_string(), v);
            record
        })
        .collect();
    ResultSet::with_columns(vec![name.to_string()], rows)
}

mod compute_stats_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_numeric_column() {
        let rs = column(
            "amount",
            vec![Value::Int64(10), Value::Float64(2.5), Value::Null, Value::Int64(10)],
        );

        let stats = compute_stats(&rs, "amount").unwrap();

        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.non_null_count, 3);
        assert_eq!(stats.null_count, 1);
        assert_eq!(stats.distinct_count, 2);
        assert_eq!(
            stats.numeric,
            Some(NumericSummary {
                min: 2.5,
                max: 10.0,
                sum: 22.5,
                mean: 7.5,
            })
        );
    }

    #[test]
    fn test_text_column_has_no_numeric_summary() {
        let rs = column("name", vec!["alice".into(), "bob".into(), "alice".into()]);

        let stats = compute_stats(&rs, "name").unwrap();

        assert_eq!(stats.distinct_count, 2);
        assert!(!stats.is_numeric());
        assert_eq!(stats.mean(), None);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let rs = column("price", vec!["1.5".into(), " 3.5 ".into()]);

        let stats = compute_stats(&rs, "price").unwrap();

        assert_eq!(stats.sum(), Some(5.0));
        assert_eq!(stats.mean(), Some(2.5));
    }

    #[test]
    fn test_first_value_decides_numeric_eligibility() {
        let numeric_first = column("v", vec![Value::Int64(4), "n/a".into(), Value::Int64(8)]);
        let text_first = column("v", vec!["n/a".into(), Value::Int64(4), Value::Int64(8)]);

        let stats = compute_stats(&numeric_first, "v").unwrap();
        assert_eq!(stats.non_null_count, 3);
        assert_eq!(stats.min(), Some(4.0));
        assert_eq!(stats.max(), Some(8.0));
        assert_eq!(stats.mean(), Some(6.0));

        assert_eq!(compute_stats(&text_first, "v").unwrap().numeric, None);
    }

    #[test]
    fn test_number_and_text_with_same_rendering_are_distinct() {
        let rs = column("v", vec![Value::Int64(1), "1".into(), Value::Float64(1.0)]);

        let stats = compute_stats(&rs, "v").unwrap();

        assert_eq!(stats.distinct_count, 2);
    }

    #[test]
    fn test_booleans_are_not_numeric() {
        let rs = column("active", vec![Value::Bool(true), Value::Bool(false)]);

        let stats = compute_stats(&rs, "active").unwrap();

        assert_eq!(stats.distinct_count, 2);
        assert!(stats.numeric.is_none());
    }

    #[test]
    fn test_missing_key_counts_as_null() {
        let mut with_value = Record::new();
        with_value.insert("a".into(), Value::Int64(1));
        let mut without = Record::new();
        without.insert("b".into(), Value::Int64(2));
        let rs = ResultSet::with_columns(vec!["a".into(), "b".into()], vec![with_value, without]);

        let stats = compute_stats(&rs, "a").unwrap();

        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.null_count, 1);
    }

    #[test]
    fn test_all_null_column() {
        let rs = column("v", vec![Value::Null, Value::Null]);

        let stats = compute_stats(&rs, "v").unwrap();

        assert_eq!(stats.non_null_count, 0);
        assert_eq!(stats.distinct_count, 0);
        assert!(stats.numeric.is_none());
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let rs = column("v", vec![Value::Int64(1)]);

        let err = compute_stats(&rs, "missing").unwrap_err();

        assert!(matches!(err, WorkbenchError::InvalidColumn(c) if c == "missing"));
    }

    #[test]
    fn test_deterministic_and_counts_consistent() {
        let rs = column(
            "v",
            vec![Value::Int64(3), Value::Null, "x".into(), Value::Float64(-1.25), Value::Int64(3)],
        );

        let first = compute_stats(&rs, "v").unwrap();
        let second = compute_stats(&rs, "v").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.non_null_count + first.null_count, first.total_count);
        assert!(first.distinct_count <= first.total_count);
    }
}

mod statistics_engine_tests {
    use super::*;

    #[test]
    fn test_caches_per_cell_and_column() {
        let engine = StatisticsEngine::new();
        let cell = CellId::new();
        let rs = column("v", vec![Value::Int64(1)]);

        assert!(engine.cached(cell, "v").is_none());
        let stats = engine.column_statistics(cell, &rs, "v").unwrap();

        assert_eq!(engine.cached(cell, "v"), Some(stats));
        assert!(engine.cached(CellId::new(), "v").is_none());
    }

    #[test]
    fn test_invalidate_drops_all_columns_of_cell() {
        let engine = StatisticsEngine::new();
        let cell = CellId::new();
        let other = CellId::new();
        let rs = column("v", vec![Value::Int64(1)]);

        engine.column_statistics(cell, &rs, "v").unwrap();
        engine.column_statistics(other, &rs, "v").unwrap();
        engine.invalidate(cell);

        assert!(!engine.has_entries(cell));
        assert!(engine.has_entries(other));
    }

    #[test]
    fn test_invalid_column_is_not_cached() {
        let engine = StatisticsEngine::new();
        let cell = CellId::new();
        let rs = column("v", vec![Value::Int64(1)]);

        assert!(engine.column_statistics(cell, &rs, "nope").is_err());
        assert!(!engine.has_entries(cell));
    }
}
