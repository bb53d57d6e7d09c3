use crate::error::{MlError, MlResult};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage kind of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// A single nullable column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Text(_) => ColumnKind::Text,
        }
    }

    pub fn missing_count(&self) -> usize {
        match self {
            Column::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            Column::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Fraction of missing cells; an empty column counts as fully present.
    pub fn missing_ratio(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.missing_count() as f64 / self.len() as f64
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match self {
            Column::Text(v) => Some(v),
            Column::Numeric(_) => None,
        }
    }

    /// Gather the given rows into a new column.
    pub fn take(&self, indices: &[usize]) -> MlResult<Column> {
        let size = self.len();
        if let Some(&bad) = indices.iter().find(|&&i| i >= size) {
            return Err(MlError::IndexOutOfBounds {
                index: bad,
                axis: 0,
                size,
            });
        }
        Ok(match self {
            Column::Numeric(v) => Column::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(indices.iter().map(|&i| v[i].clone()).collect()),
        })
    }
}

/// Column-oriented tabular record set: one row per sale, named columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// An empty table with `n_rows` rows and no columns.
    pub fn with_rows(n_rows: usize) -> Self {
        Table {
            names: Vec::new(),
            columns: Vec::new(),
            n_rows,
        }
    }

    /// Build a table from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Column)>) -> MlResult<Self> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let mut table = Table::with_rows(n_rows);
        for (name, column) in columns {
            table.push_column(name, column)?;
        }
        Ok(table)
    }

    /// Append a column; its length must match the table's row count.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> MlResult<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(MlError::DuplicateColumn(name));
        }
        if self.columns.is_empty() && self.n_rows == 0 {
            self.n_rows = column.len();
        }
        if column.len() != self.n_rows {
            return Err(MlError::DimensionMismatch(format!(
                "column `{}` has {} rows, table has {}",
                name,
                column.len(),
                self.n_rows
            )));
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Like [`Table::column`] but a missing column is an error.
    pub fn require(&self, name: &str) -> MlResult<&Column> {
        self.column(name)
            .ok_or_else(|| MlError::MissingColumn(name.to_string()))
    }

    /// Remove a column by name, returning it if present.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.names.remove(idx);
        Some(self.columns.remove(idx))
    }

    /// Drop a column by name. Absent columns are a no-op; returns whether one was dropped.
    pub fn drop_column(&mut self, name: &str) -> bool {
        self.remove_column(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> + '_ {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Gather the given rows of every column into a new table.
    pub fn take_rows(&self, indices: &[usize]) -> MlResult<Table> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows) {
            return Err(MlError::IndexOutOfBounds {
                index: bad,
                axis: 0,
                size: self.n_rows,
            });
        }
        let mut out = Table::with_rows(indices.len());
        for (name, column) in self.iter() {
            out.push_column(name, column.take(indices)?)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            ("a".into(), Column::Numeric(vec![Some(1.0), None, Some(3.0)])),
            (
                "b".into(),
                Column::Text(vec![Some("x".into()), Some("y".into()), None]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_shape_and_lookup() {
        let t = sample();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.n_cols(), 2);
        assert_eq!(t.column("a").unwrap().kind(), ColumnKind::Numeric);
        assert!(t.column("zzz").is_none());
        assert!(matches!(t.require("zzz"), Err(MlError::MissingColumn(_))));
    }

    #[test]
    fn test_rejects_ragged_and_duplicate_columns() {
        let mut t = sample();
        assert!(t.push_column("c", Column::Numeric(vec![Some(1.0)])).is_err());
        assert!(t.push_column("a", Column::Numeric(vec![None; 3])).is_err());
    }

    #[test]
    fn test_missing_ratio() {
        let t = sample();
        let ratio = t.column("a").unwrap().missing_ratio();
        assert!((ratio - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_drop_column_is_idempotent() {
        let mut t = sample();
        assert!(t.drop_column("a"));
        assert!(!t.drop_column("a"));
        assert_eq!(t.column_names(), &["b".to_string()]);
        assert_eq!(t.n_rows(), 3);
    }

    #[test]
    fn test_take_rows() {
        let t = sample();
        let s = t.take_rows(&[2, 0]).unwrap();
        assert_eq!(s.n_rows(), 2);
        assert_eq!(
            s.column("a").unwrap().as_numeric().unwrap(),
            &[Some(3.0), Some(1.0)]
        );
        assert_eq!(
            s.column("b").unwrap().as_text().unwrap(),
            &[None, Some("x".to_string())]
        );
        assert!(t.take_rows(&[3]).is_err());
    }
}
