//! Dataset acquisition: make sure a local copy of the raw Ames housing CSV
//! exists, downloading and unpacking it from Kaggle when it does not.

pub mod acquire;
pub mod error;
pub mod kaggle;

pub use acquire::{ensure_dataset, ensure_dataset_with, AcquisitionConfig};
pub use error::{AcquisitionError, AcquisitionResult};
pub use kaggle::{ArchiveSource, EnvLookup, KaggleApi, KaggleCredentials};
