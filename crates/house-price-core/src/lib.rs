pub mod matrix;
pub mod table;
pub mod error;

pub use matrix::Matrix;
pub use table::{Column, ColumnKind, Table};
pub use error::{MlError, MlResult};
