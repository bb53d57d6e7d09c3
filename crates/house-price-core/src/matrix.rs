use crate::error::{MlError, MlResult};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense 2-D matrix of `f64`, the numeric currency of the pipeline.
///
/// Stores data in a flat contiguous `Vec<f64>` with row-major (C-order) layout.
/// Rows are samples, columns are features.
///
/// Deserialization goes through [`Matrix::new`], so a decoded matrix always
/// has `data.len() == rows * cols`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

/// Unchecked wire form of [`Matrix`]; field order matches the derived
/// `Serialize`.
#[derive(Deserialize)]
struct RawMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = MlError;

    fn try_from(raw: RawMatrix) -> MlResult<Self> {
        Matrix::new(raw.data, raw.rows, raw.cols)
    }
}

// ─── Construction ───────────────────────────────────────────────────────────

impl Matrix {
    /// Create a matrix from raw row-major data and a shape.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> MlResult<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(MlError::ShapeMismatch {
                expected: vec![rows, cols],
                got: vec![data.len()],
            });
        }
        Ok(Matrix { data, rows, cols })
    }

    /// Create a matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Create a matrix from a nested slice of rows.
    pub fn from_vec2d(data: &[Vec<f64>]) -> MlResult<Self> {
        if data.is_empty() {
            return Ok(Matrix::zeros(0, 0));
        }
        let rows = data.len();
        let cols = data[0].len();
        for row in data {
            if row.len() != cols {
                return Err(MlError::DimensionMismatch(
                    "All rows must have the same number of columns".to_string(),
                ));
            }
        }
        let flat: Vec<f64> = data.iter().flat_map(|r| r.iter().copied()).collect();
        Matrix::new(flat, rows, cols)
    }

    /// Build a matrix from column vectors of equal length.
    pub fn from_columns(columns: &[Vec<f64>], rows: usize) -> MlResult<Self> {
        let cols = columns.len();
        let mut data = vec![0.0; rows * cols];
        for (j, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(MlError::DimensionMismatch(format!(
                    "column {} has {} values, expected {}",
                    j,
                    column.len(),
                    rows
                )));
            }
            for (i, &v) in column.iter().enumerate() {
                data[i * cols + j] = v;
            }
        }
        Ok(Matrix { data, rows, cols })
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Element at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> MlResult<f64> {
        self.check_row(i)?;
        if j >= self.cols {
            return Err(MlError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: self.cols,
            });
        }
        Ok(self.data[i * self.cols + j])
    }

    /// Borrow row `i` as a slice.
    pub fn row(&self, i: usize) -> MlResult<&[f64]> {
        self.check_row(i)?;
        Ok(&self.data[i * self.cols..(i + 1) * self.cols])
    }

    /// Iterate over rows as slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        // chunks_exact(0) panics, so zero-width matrices yield empty rows directly.
        let cols = self.cols.max(1);
        let empty_rows = if self.cols == 0 { self.rows } else { 0 };
        self.data
            .chunks_exact(cols)
            .chain(std::iter::repeat(&[][..]).take(empty_rows))
    }

    /// Copy column `j` into a new vector.
    pub fn column(&self, j: usize) -> MlResult<Vec<f64>> {
        if j >= self.cols {
            return Err(MlError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: self.cols,
            });
        }
        Ok((0..self.rows).map(|i| self.data[i * self.cols + j]).collect())
    }

    /// Column-major copy of the whole matrix, one `Vec` per feature.
    pub fn to_columns(&self) -> Vec<Vec<f64>> {
        let mut columns = vec![Vec::with_capacity(self.rows); self.cols];
        for row in self.iter_rows() {
            for (j, &v) in row.iter().enumerate() {
                columns[j].push(v);
            }
        }
        columns
    }

    fn check_row(&self, i: usize) -> MlResult<()> {
        if i >= self.rows {
            return Err(MlError::IndexOutOfBounds {
                index: i,
                axis: 0,
                size: self.rows,
            });
        }
        Ok(())
    }

    // ─── Row / column manipulation ──────────────────────────────────────────

    /// Gather the given rows (in order, duplicates allowed) into a new matrix.
    pub fn select_rows(&self, indices: &[usize]) -> MlResult<Matrix> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i)?);
        }
        Matrix::new(data, indices.len(), self.cols)
    }

    /// Concatenate matrices side by side (along the column axis).
    pub fn hconcat(blocks: &[&Matrix]) -> MlResult<Matrix> {
        let Some(first) = blocks.first() else {
            return Ok(Matrix::zeros(0, 0));
        };
        let rows = first.rows;
        if let Some(bad) = blocks.iter().find(|b| b.rows != rows) {
            return Err(MlError::ShapeMismatch {
                expected: vec![rows, bad.cols],
                got: vec![bad.rows, bad.cols],
            });
        }
        let cols: usize = blocks.iter().map(|b| b.cols).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for block in blocks {
                data.extend_from_slice(&block.data[i * block.cols..(i + 1) * block.cols]);
            }
        }
        Matrix::new(data, rows, cols)
    }

    /// Matrix-vector product `X · w`.
    pub fn matvec(&self, w: &[f64]) -> MlResult<Vec<f64>> {
        if w.len() != self.cols {
            return Err(MlError::DimensionMismatch(format!(
                "matvec: matrix has {} columns but vector has {} elements",
                self.cols,
                w.len()
            )));
        }
        Ok(self
            .iter_rows()
            .map(|row| row.iter().zip(w).map(|(&a, &b)| a * b).sum())
            .collect())
    }

    /// Whether every element is finite.
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix({}x{})", self.rows, self.cols)?;
        for row in self.iter_rows().take(5) {
            let cells: Vec<String> = row.iter().take(8).map(|v| format!("{:.4}", v)).collect();
            let ellipsis = if row.len() > 8 { ", ..." } else { "" };
            writeln!(f, "  [{}{}]", cells.join(", "), ellipsis)?;
        }
        if self.rows > 5 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}
