use thiserror::Error;

use crate::table::ColumnKind;

/// Core error type shared by every numeric and data-handling crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MlError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Model not fitted: {0}")]
    NotFitted(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Column `{column}` must be {expected}")]
    ColumnKind { column: String, expected: ColumnKind },

    #[error("Missing target value in column `{column}` at row {row}")]
    MissingTarget { column: String, row: usize },

    #[error("Non-finite value: {0}")]
    NonFinite(String),
}

pub type MlResult<T> = Result<T, MlError>;
