use crate::error::{AcquisitionError, AcquisitionResult};
use crate::kaggle::{ArchiveSource, KaggleApi};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the raw dataset lives and where it comes from.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Kaggle dataset handle, `owner/slug`.
    pub dataset: String,
    /// Directory the archive is extracted into.
    pub raw_dir: PathBuf,
    /// File expected in `raw_dir` after extraction.
    pub file_name: String,
    /// Directory holding `kaggle.json`.
    pub kaggle_config_dir: PathBuf,
}

impl AcquisitionConfig {
    pub fn dataset_path(&self) -> PathBuf {
        self.raw_dir.join(&self.file_name)
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        AcquisitionConfig {
            dataset: "prevek18/ames-housing-dataset".to_string(),
            raw_dir: PathBuf::from("data/raw"),
            file_name: "AmesHousing.csv".to_string(),
            kaggle_config_dir: PathBuf::from(".kaggle"),
        }
    }
}

/// Make sure the raw dataset exists locally, downloading it from Kaggle if not.
pub fn ensure_dataset(config: &AcquisitionConfig, force_refresh: bool) -> AcquisitionResult<PathBuf> {
    let api = KaggleApi::new(&config.kaggle_config_dir);
    ensure_dataset_with(config, force_refresh, &api)
}

/// [`ensure_dataset`] with an explicit archive source.
pub fn ensure_dataset_with(
    config: &AcquisitionConfig,
    force_refresh: bool,
    source: &dyn ArchiveSource,
) -> AcquisitionResult<PathBuf> {
    let path = config.dataset_path();

    if force_refresh && path.exists() {
        info!(path = %path.display(), "removing local copy to download it again");
        std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
    }
    if path.exists() {
        info!(path = %path.display(), "dataset already present, skipping download");
        return Ok(path);
    }

    let bytes = source.fetch_archive(&config.dataset)?;
    std::fs::create_dir_all(&config.raw_dir).map_err(|e| io_err(&config.raw_dir, e))?;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    info!(files = archive.len(), dir = %config.raw_dir.display(), "extracting archive");
    archive.extract(&config.raw_dir)?;

    if !path.exists() {
        return Err(AcquisitionError::MissingFile { path });
    }
    info!(path = %path.display(), "dataset ready");
    Ok(path)
}

fn io_err(path: &Path, source: std::io::Error) -> AcquisitionError {
    AcquisitionError::Io {
        path: path.to_path_buf(),
        source,
    }
}
