use std::path::PathBuf;
use thiserror::Error;

/// Failures while obtaining the raw dataset. All of them are fatal for the
/// dataset run; nothing is retried.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error(
        "Kaggle credentials not found: set KAGGLE_USERNAME and KAGGLE_KEY or provide {path}"
    )]
    MissingCredentials { path: PathBuf },

    #[error("invalid Kaggle credentials file {path}: {source}")]
    InvalidCredentials {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("download of {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not unpack dataset archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("expected {path} after extraction, but it is missing")]
    MissingFile { path: PathBuf },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type AcquisitionResult<T> = Result<T, AcquisitionError>;
