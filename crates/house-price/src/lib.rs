//! # house-price
//!
//! Predicts Ames, Iowa sale prices from the Kaggle housing dataset.
//!
//! ## Modules
//!
//! - **core**: `Matrix`, column-oriented `Table`, shared error type
//! - **linalg**: pivoted-QR least squares
//! - **preprocessing**: cleaning, train/validation split, imputers, scaler, one-hot encoder, column transformer
//! - **linear**: ordinary least squares
//! - **tree**: CART regressor, random forest, histogram gradient boosting
//! - **metrics**: MSE, RMSE, MAE, R²
//! - **io**: CSV reading and bincode artifacts
//! - **datasets**: Kaggle download and extraction
//! - **pipeline**: dataset and training runs, model roster, selection, persistence
//! - **serve**: feature schema, form reducer, REST inference

/// Matrix, table and error types.
pub use house_price_core as core;

/// Least squares.
pub use house_price_linalg as linalg;

/// Data preparation.
pub use house_price_preprocessing as preprocessing;

/// Linear models.
pub use house_price_linear as linear;

/// Tree-based models.
pub use house_price_tree as tree;

/// Regression metrics.
pub use house_price_metrics as metrics;

/// CSV and artifact I/O.
pub use house_price_io as io;

/// Dataset acquisition.
pub use house_price_datasets as datasets;

/// Batch runs.
pub use house_price_pipeline as pipeline;

/// Online inference.
pub use house_price_serve as serve;
