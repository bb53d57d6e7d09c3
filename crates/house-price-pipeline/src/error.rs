use house_price_core::MlError;
use house_price_datasets::AcquisitionError;
use house_price_io::IoError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] MlError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("model `{name}` failed: {source}")]
    Model {
        name: String,
        #[source]
        source: MlError,
    },

    #[error("no candidate models to select from")]
    EmptyRoster,

    #[error("cannot load {path}; rerun `house-price {rerun}` first ({source})")]
    Artifact {
        path: PathBuf,
        rerun: &'static str,
        #[source]
        source: IoError,
    },

    #[error("{path} is invalid; rerun `house-price {rerun}` ({source})")]
    InvalidArtifact {
        path: PathBuf,
        rerun: &'static str,
        #[source]
        source: MlError,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
