use std::collections::{BTreeMap, HashSet};

use super::value::Value;
use crate::error::{PipelineError, Result};

/// An ordered, row-oriented table with a uniform schema.
///
/// Columns are identified by name and kept in first-seen order. Every row holds exactly
/// one value per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut dataset = Self::new(columns);
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Build a dataset from name/value records; columns are the union of keys in
    /// first-seen order and missing keys become null.
    pub fn from_records<K, I, R>(records: R) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
        R: IntoIterator<Item = I>,
    {
        let mut dataset = Dataset::default();
        for record in records {
            let mut row = vec![Value::Null; dataset.columns.len()];
            for (name, value) in record {
                let idx = dataset.ensure_column(name.into());
                if idx >= row.len() {
                    row.resize(idx + 1, Value::Null);
                }
                row[idx] = value;
            }
            dataset.rows.push(row);
        }
        dataset
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Values of one column in row order
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn null_count(&self, name: &str) -> Option<usize> {
        self.column_values(name).map(|vals| vals.filter(|v| v.is_null()).count())
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::Schema(format!(
                "row has {} values but dataset has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append another dataset, unioning the column sets. Columns missing on either side
    /// are filled with nulls.
    pub fn concat(&mut self, other: Dataset) {
        let mapping: Vec<usize> = other
            .columns
            .into_iter()
            .map(|name| self.ensure_column(name))
            .collect();
        let width = self.columns.len();
        self.rows.reserve(other.rows.len());
        for row in other.rows {
            let mut out = vec![Value::Null; width];
            for (value, &idx) in row.into_iter().zip(&mapping) {
                out[idx] = value;
            }
            self.rows.push(out);
        }
    }

    /// Keep rows matching the predicate; returns how many were removed
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Value]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Collapse rows identical across every column, keeping the first occurrence.
    /// Returns the number of rows removed.
    pub fn dedup_rows(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    /// Replace every value of a column; returns false when the column is absent
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(&Value) -> Value,
    {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            let value = f(&row[idx]);
            row[idx] = value;
        }
        true
    }

    /// Add a column computed from each row. An existing column of the same name is
    /// overwritten.
    pub fn add_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&[Value]) -> Value,
    {
        let idx = self.ensure_column(name.to_string());
        for row in &mut self.rows {
            let value = f(row.as_slice());
            row[idx] = value;
        }
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        Some(self.rows.iter_mut().map(|row| row.remove(idx)).collect())
    }

    /// Split the dataset by the value of `column`. Row order inside each group follows
    /// the original order. Returns `None` when the column does not exist.
    pub fn split_by(&self, column: &str) -> Option<BTreeMap<Option<String>, Dataset>> {
        let idx = self.column_index(column)?;
        let mut groups: BTreeMap<Option<String>, Dataset> = BTreeMap::new();
        for row in &self.rows {
            groups
                .entry(row[idx].to_text())
                .or_insert_with(|| Dataset::new(self.columns.clone()))
                .rows
                .push(row.clone());
        }
        Some(groups)
    }

    /// First `n` rows as a new dataset
    pub fn head(&self, n: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    fn ensure_column(&mut self, name: String) -> usize {
        if let Some(idx) = self.column_index(&name) {
            return idx;
        }
        self.columns.push(name);
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut ds = Dataset::new(cols(&["a", "b"]));
        assert!(ds.push_row(vec![Value::Int(1)]).is_err());
        assert!(ds.push_row(vec![Value::Int(1), Value::Null]).is_ok());
    }

    #[test]
    fn test_concat_unions_columns_with_nulls() {
        let mut left = Dataset::from_rows(cols(&["a", "b"]), vec![vec![Value::Int(1), Value::Int(2)]]).unwrap();
        let right = Dataset::from_rows(cols(&["b", "c"]), vec![vec![Value::Int(3), Value::text("x")]]).unwrap();
        left.concat(right);

        assert_eq!(left.columns(), &cols(&["a", "b", "c"])[..]);
        assert_eq!(left.rows()[0], vec![Value::Int(1), Value::Int(2), Value::Null]);
        assert_eq!(left.rows()[1], vec![Value::Null, Value::Int(3), Value::text("x")]);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut ds = Dataset::from_rows(
            cols(&["a", "b"]),
            vec![
                vec![Value::Int(1), Value::text("x")],
                vec![Value::Int(2), Value::text("y")],
                vec![Value::Int(1), Value::text("x")],
                vec![Value::Int(1), Value::Null],
            ],
        )
        .unwrap();

        assert_eq!(ds.dedup_rows(), 1);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.value(1, "b"), Some(&Value::text("y")));
    }

    #[test]
    fn test_from_records_fills_missing_keys() {
        let ds = Dataset::from_records(vec![
            vec![("a", Value::Int(1))],
            vec![("b", Value::Int(2)), ("a", Value::Int(3))],
        ]);
        assert_eq!(ds.columns(), &cols(&["a", "b"])[..]);
        assert_eq!(ds.rows()[0], vec![Value::Int(1), Value::Null]);
        assert_eq!(ds.rows()[1], vec![Value::Int(3), Value::Int(2)]);
    }

    #[test]
    fn test_split_by_groups_rows_in_order() {
        let ds = Dataset::from_rows(
            cols(&["k", "v"]),
            vec![
                vec![Value::text("b"), Value::Int(1)],
                vec![Value::text("a"), Value::Int(2)],
                vec![Value::Null, Value::Int(3)],
                vec![Value::text("b"), Value::Int(4)],
            ],
        )
        .unwrap();

        let groups = ds.split_by("k").unwrap();
        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(keys, vec![None, Some("a".to_string()), Some("b".to_string())]);
        let b = &groups[&Some("b".to_string())];
        assert_eq!(b.len(), 2);
        assert_eq!(b.value(1, "v"), Some(&Value::Int(4)));
        assert!(ds.split_by("missing").is_none());
    }

    #[test]
    fn test_drop_column_removes_values() {
        let mut ds = Dataset::from_rows(cols(&["a", "b"]), vec![vec![Value::Int(1), Value::Int(2)]]).unwrap();
        assert_eq!(ds.drop_column("a"), Some(vec![Value::Int(1)]));
        assert_eq!(ds.columns(), &cols(&["b"])[..]);
        assert_eq!(ds.rows()[0], vec![Value::Int(2)]);
    }
}
