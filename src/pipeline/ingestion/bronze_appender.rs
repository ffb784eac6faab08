use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value as JsonValue};

use crate::constants;
use crate::domain::{columns, Dataset, Value};
use crate::error::Result;
use crate::pipeline::processing::normalize::values::{coerce_numeric, month_start, partition_key};
use crate::pipeline::storage::{columnar, partition_dir};

/// Outcome of appending one page into the bronze layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendStats {
    pub rows_in: usize,
    pub rows_appended: usize,
    /// Rows whose `ano`/`mes` could not produce a partition key
    pub rows_skipped: usize,
    /// Set when the page lacks `ano` or `mes` entirely and nothing was written
    pub missing_partition_columns: bool,
    /// Rows appended per partition key
    pub partitions: BTreeMap<String, usize>,
}

/// Convert one JSON value into a cell. Arrays are kept as their JSON text.
pub fn json_to_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::from),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => Value::Text(value.to_string()),
    }
}

fn flatten_into(prefix: Option<&str>, object: &Map<String, JsonValue>, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let name = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            JsonValue::Object(inner) => flatten_into(Some(&name), inner, out),
            other => out.push((name, json_to_value(other))),
        }
    }
}

/// Flatten API result records into a dataset. Nested objects become `parent.child`
/// columns; non-object records are ignored.
pub fn flatten_results(results: &[JsonValue]) -> Dataset {
    Dataset::from_records(results.iter().filter_map(JsonValue::as_object).map(|record| {
        let mut cells = Vec::with_capacity(record.len());
        flatten_into(None, record, &mut cells);
        cells
    }))
}

/// Partition key and month start for a row, when its `ano`/`mes` are usable numbers
fn row_partition(row: &[Value], ano: usize, mes: usize) -> Option<(String, Value)> {
    let ano = coerce_numeric(&row[ano]).ok()?;
    let mes = coerce_numeric(&row[mes]).ok()?;
    let key = partition_key(&ano, &mes)?;
    let start = month_start(&ano, &mes)?;
    Some((key, Value::Timestamp(start)))
}

/// Path of the bronze file for a partition key
pub fn bronze_file(bronze_root: &Path, key: &str) -> PathBuf {
    partition_dir(bronze_root, key).join(constants::bronze_file_name(key))
}

/// Tag a page's records with `mes_ano` and `_pagina_origem`, then merge-append them into
/// their bronze partition files.
pub fn append_page(bronze_root: &Path, page: u32, results: &[JsonValue]) -> Result<AppendStats> {
    let mut dataset = flatten_results(results);
    let mut stats = AppendStats {
        rows_in: dataset.len(),
        ..AppendStats::default()
    };

    let (Some(ano), Some(mes)) = (
        dataset.column_index(columns::ANO),
        dataset.column_index(columns::MES),
    ) else {
        stats.missing_partition_columns = !dataset.is_empty();
        return Ok(stats);
    };

    let mut keys = Vec::with_capacity(dataset.len());
    dataset.add_column(columns::MES_ANO, |row| match row_partition(row, ano, mes) {
        Some((key, start)) => {
            keys.push(Some(key));
            start
        }
        None => {
            keys.push(None);
            Value::Null
        }
    });
    dataset.add_column(columns::PAGINA_ORIGEM, |_| Value::Int(i64::from(page)));

    let mut groups: BTreeMap<String, Dataset> = BTreeMap::new();
    for (row, key) in dataset.rows().iter().zip(keys) {
        match key {
            Some(key) => groups
                .entry(key)
                .or_insert_with(|| Dataset::new(dataset.columns().to_vec()))
                .push_row(row.clone())?,
            None => stats.rows_skipped += 1,
        }
    }

    for (key, group) in groups {
        let path = bronze_file(bronze_root, &key);
        let rows = group.len();
        let merged = if path.is_file() {
            let mut existing = columnar::read_parquet_file(&path)?;
            existing.concat(group);
            existing
        } else {
            group
        };
        columnar::write_parquet_file(&path, &merged)?;
        stats.rows_appended += rows;
        stats.partitions.insert(key, rows);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_flatten_nested_objects_and_arrays() {
        let ds = flatten_results(&[
            json!({"valor": 1.5, "orgao": {"codigo": 10, "nome": "MS"}, "tags": ["a"]}),
            json!({"valor": 2, "extra": null}),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(0, "orgao.codigo"), Some(&Value::Int(10)));
        assert_eq!(ds.value(0, "orgao.nome"), Some(&Value::text("MS")));
        assert_eq!(ds.value(0, "tags"), Some(&Value::text(r#"["a"]"#)));
        assert_eq!(ds.value(1, "valor"), Some(&Value::Int(2)));
        assert_eq!(ds.value(1, "orgao.nome"), Some(&Value::Null));
    }

    #[test]
    fn test_append_groups_by_month_and_tags_rows() {
        let dir = tempdir().unwrap();
        let results = vec![
            json!({"valor": 10.0, "ano": 2023, "mes": 1}),
            json!({"valor": 20.0, "ano": 2023, "mes": 2}),
            json!({"valor": 30.0, "ano": "2023", "mes": "2"}),
            json!({"valor": 40.0, "ano": null, "mes": 2}),
        ];

        let stats = append_page(dir.path(), 4, &results).unwrap();
        assert_eq!(stats.rows_in, 4);
        assert_eq!(stats.rows_appended, 3);
        assert_eq!(stats.rows_skipped, 1);
        assert_eq!(stats.partitions.get("2023_02"), Some(&2));

        let feb = columnar::read_parquet_file(&bronze_file(dir.path(), "2023_02")).unwrap();
        assert_eq!(feb.len(), 2);
        assert_eq!(feb.value(0, "_pagina_origem"), Some(&Value::Int(4)));
        assert!(matches!(feb.value(0, "mes_ano"), Some(Value::Timestamp(_))));
    }

    #[test]
    fn test_append_merges_with_existing_file() {
        let dir = tempdir().unwrap();
        append_page(dir.path(), 1, &[json!({"valor": 1.0, "ano": 2023, "mes": 1})]).unwrap();
        append_page(dir.path(), 2, &[json!({"valor": 2.0, "ano": 2023, "mes": 1, "orgao": "X"})]).unwrap();

        let jan = columnar::read_parquet_file(&bronze_file(dir.path(), "2023_01")).unwrap();
        assert_eq!(jan.len(), 2);
        assert_eq!(jan.value(0, "_pagina_origem"), Some(&Value::Int(1)));
        assert_eq!(jan.value(1, "_pagina_origem"), Some(&Value::Int(2)));
        assert_eq!(jan.value(0, "orgao"), Some(&Value::Null));
    }

    #[test]
    fn test_page_without_partition_columns_writes_nothing() {
        let dir = tempdir().unwrap();
        let stats = append_page(dir.path(), 1, &[json!({"valor": 1.0})]).unwrap();
        assert!(stats.missing_partition_columns);
        assert_eq!(stats.rows_appended, 0);
        assert!(!dir.path().join("ano_mes=2023_01").exists());
    }
}
