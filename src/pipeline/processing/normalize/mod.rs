pub mod values;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{columns, Dataset, Value};

pub use values::{coerce_numeric, parse_timestamp, partition_key, standardize_text, ValueParseError};

/// Counters describing what a transform did to the dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformStats {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Exact-duplicate rows collapsed
    pub duplicates_removed: usize,
    /// Rows dropped for `valor <= 0` or null `valor`
    pub non_positive_removed: usize,
    /// Values that failed numeric or temporal parsing and were set to null, per column
    pub coerced_to_null: BTreeMap<String, usize>,
    /// Whether `ano_mes` was computed by this transform
    pub partition_key_derived: bool,
}

impl TransformStats {
    pub fn total_coerced_to_null(&self) -> usize {
        self.coerced_to_null.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub dataset: Dataset,
    pub stats: TransformStats,
}

/// Trait for turning bronze rows into silver rows
pub trait Transformer {
    fn transform(&self, dataset: Dataset) -> TransformOutcome;
}

/// Default bronze -> silver cleaning.
///
/// Steps run in a fixed order since later ones depend on earlier effects:
/// dedup, numeric coercion, temporal parsing, text standardization, validity filter,
/// partition-key derivation.
#[derive(Debug, Clone, Default)]
pub struct SilverNormalizer;

impl SilverNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn coerce_column<F>(dataset: &mut Dataset, column: &str, stats: &mut TransformStats, parse: F)
    where
        F: Fn(&Value) -> Result<Value, ValueParseError>,
    {
        let mut failures = 0;
        let present = dataset.map_column(column, |v| {
            parse(v).unwrap_or_else(|_| {
                failures += 1;
                Value::Null
            })
        });
        if present && failures > 0 {
            stats.coerced_to_null.insert(column.to_string(), failures);
        }
    }

    fn remove_non_positive(dataset: &mut Dataset) -> usize {
        let Some(idx) = dataset.column_index(columns::VALOR) else {
            return 0;
        };
        dataset.retain_rows(|row| row[idx].as_f64().is_some_and(|v| v > 0.0))
    }

    fn derive_partition_key(dataset: &mut Dataset) -> bool {
        if dataset.has_column(columns::ANO_MES) {
            return false;
        }
        let (Some(ano), Some(mes)) = (
            dataset.column_index(columns::ANO),
            dataset.column_index(columns::MES),
        ) else {
            return false;
        };
        dataset.add_column(columns::ANO_MES, |row| {
            partition_key(&row[ano], &row[mes]).map_or(Value::Null, Value::Text)
        });
        true
    }
}

impl Transformer for SilverNormalizer {
    fn transform(&self, mut dataset: Dataset) -> TransformOutcome {
        let mut stats = TransformStats {
            rows_in: dataset.len(),
            ..TransformStats::default()
        };

        stats.duplicates_removed = dataset.dedup_rows();

        for column in columns::NUMERIC {
            Self::coerce_column(&mut dataset, column, &mut stats, coerce_numeric);
        }

        Self::coerce_column(&mut dataset, columns::MES_ANO, &mut stats, parse_timestamp);

        for column in columns::TEXT {
            dataset.map_column(column, standardize_text);
        }

        stats.non_positive_removed = Self::remove_non_positive(&mut dataset);
        stats.partition_key_derived = Self::derive_partition_key(&mut dataset);
        stats.rows_out = dataset.len();

        TransformOutcome { dataset, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(columns: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
        Dataset::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
    }

    fn bronze_sample() -> Dataset {
        dataset(
            &["valor", "ano", "mes", "orgao", "favorecido", "mes_ano", "extra"],
            vec![
                vec![Value::text("10.5"), Value::Int(2023), Value::Int(1), Value::text(" ministerio "), Value::text("fulano"), Value::text("2023-01-01"), Value::Int(1)],
                vec![Value::text("10.5"), Value::Int(2023), Value::Int(1), Value::text(" ministerio "), Value::text("fulano"), Value::text("2023-01-01"), Value::Int(1)],
                vec![Value::Float(0.0), Value::Int(2023), Value::Int(2), Value::text("x"), Value::text("y"), Value::Null, Value::Int(2)],
                vec![Value::text("abc"), Value::Int(2023), Value::Int(2), Value::text("x"), Value::text("y"), Value::Null, Value::Int(3)],
                vec![Value::Float(-3.0), Value::Int(2023), Value::Int(2), Value::text("x"), Value::text("y"), Value::Null, Value::Int(4)],
                vec![Value::Int(7), Value::text("2022"), Value::text("12"), Value::text("nan"), Value::text(""), Value::text("garbage"), Value::Int(5)],
            ],
        )
    }

    #[test]
    fn test_transform_counts_each_step() {
        let outcome = SilverNormalizer::new().transform(bronze_sample());
        let stats = &outcome.stats;

        assert_eq!(stats.rows_in, 6);
        assert_eq!(stats.duplicates_removed, 1);
        // 0.0, "abc" (null after coercion) and -3.0
        assert_eq!(stats.non_positive_removed, 3);
        assert_eq!(stats.rows_out, 2);
        assert_eq!(stats.coerced_to_null.get("valor"), Some(&1));
        assert_eq!(stats.coerced_to_null.get("mes_ano"), Some(&1));
        assert!(stats.partition_key_derived);
    }

    #[test]
    fn test_transform_normalizes_values() {
        let ds = SilverNormalizer::new().transform(bronze_sample()).dataset;

        assert_eq!(ds.value(0, "valor"), Some(&Value::Float(10.5)));
        assert_eq!(ds.value(0, "orgao"), Some(&Value::text("MINISTERIO")));
        assert_eq!(ds.value(0, "favorecido"), Some(&Value::text("FULANO")));
        assert!(matches!(ds.value(0, "mes_ano"), Some(Value::Timestamp(_))));
        assert_eq!(ds.value(0, "ano_mes"), Some(&Value::text("2023_01")));

        assert_eq!(ds.value(1, "ano"), Some(&Value::Int(2022)));
        assert_eq!(ds.value(1, "orgao"), Some(&Value::Null));
        assert_eq!(ds.value(1, "favorecido"), Some(&Value::Null));
        assert_eq!(ds.value(1, "mes_ano"), Some(&Value::Null));
        assert_eq!(ds.value(1, "ano_mes"), Some(&Value::text("2022_12")));
        assert_eq!(ds.value(1, "extra"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_transform_keeps_existing_partition_key() {
        let ds = dataset(
            &["valor", "ano", "mes", "ano_mes"],
            vec![vec![Value::Int(1), Value::Int(2023), Value::Int(3), Value::text("custom")]],
        );
        let outcome = SilverNormalizer::new().transform(ds);
        assert!(!outcome.stats.partition_key_derived);
        assert_eq!(outcome.dataset.value(0, "ano_mes"), Some(&Value::text("custom")));
    }

    #[test]
    fn test_transform_without_partition_columns_adds_no_key() {
        let ds = dataset(&["valor", "ano"], vec![vec![Value::Int(1), Value::Int(2023)]]);
        let outcome = SilverNormalizer::new().transform(ds);
        assert!(!outcome.dataset.has_column("ano_mes"));
    }

    #[test]
    fn test_transform_without_valor_drops_nothing() {
        let ds = dataset(&["orgao"], vec![vec![Value::text("a")], vec![Value::text("b")]]);
        let outcome = SilverNormalizer::new().transform(ds);
        assert_eq!(outcome.stats.non_positive_removed, 0);
        assert_eq!(outcome.dataset.len(), 2);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let normalizer = SilverNormalizer::new();
        let once = normalizer.transform(bronze_sample()).dataset;
        let twice = normalizer.transform(once.clone());

        assert_eq!(twice.stats.duplicates_removed, 0);
        assert_eq!(twice.stats.non_positive_removed, 0);
        assert_eq!(twice.dataset, once);
    }

    #[test]
    fn test_text_columns_are_clean() {
        let ds = SilverNormalizer::new().transform(bronze_sample()).dataset;
        for column in columns::TEXT {
            let Some(cells) = ds.column_values(column) else {
                continue;
            };
            for text in cells.filter_map(Value::as_str) {
                assert!(!values::is_null_sentinel(text));
                assert_eq!(text, text.trim());
                assert_eq!(text, text.to_uppercase());
            }
        }
    }

    #[test]
    fn test_partition_key_matches_ano_and_mes() {
        let ds = SilverNormalizer::new().transform(bronze_sample()).dataset;
        for row in 0..ds.len() {
            let (Some(ano), Some(mes)) = (
                ds.value(row, "ano").and_then(Value::as_i64),
                ds.value(row, "mes").and_then(Value::as_i64),
            ) else {
                continue;
            };
            assert_eq!(ds.value(row, "ano_mes"), Some(&Value::Text(format!("{ano}_{mes:02}"))));
        }
    }

    #[test]
    fn test_no_row_has_non_positive_valor() {
        let ds = SilverNormalizer::new().transform(bronze_sample()).dataset;
        assert!(ds
            .column_values("valor")
            .unwrap()
            .all(|v| v.as_f64().is_some_and(|x| x > 0.0)));
    }
}
