use crate::error::PipelineResult;
use config::{Config, Environment, File};
use house_price_datasets::AcquisitionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default settings file looked up in the working directory (any format
/// the `config` crate understands, e.g. `house-price.toml`).
pub const SETTINGS_FILE: &str = "house-price";
pub const ENV_PREFIX: &str = "HOUSE_PRICE";

/// Runtime settings: defaults, then the settings file, then `HOUSE_PRICE_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub project_root: PathBuf,
    pub kaggle_dataset: String,
    /// Directory holding `kaggle.json`; relative paths resolve against
    /// `project_root`.
    pub kaggle_config_dir: PathBuf,
    pub serve_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            project_root: PathBuf::from("."),
            kaggle_dataset: "prevek18/ames-housing-dataset".to_string(),
            kaggle_config_dir: PathBuf::from(".kaggle"),
            serve_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Settings {
    /// Load settings. An explicit `file` must exist; otherwise the default
    /// settings file is optional.
    pub fn load(file: Option<&Path>) -> PipelineResult<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("project_root", defaults.project_root.to_string_lossy().into_owned())?
            .set_default("kaggle_dataset", defaults.kaggle_dataset)?
            .set_default(
                "kaggle_config_dir",
                defaults.kaggle_config_dir.to_string_lossy().into_owned(),
            )?
            .set_default("serve_addr", defaults.serve_addr)?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(SETTINGS_FILE).required(false)),
        };
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn paths(&self) -> ProjectPaths {
        let mut paths = ProjectPaths::new(&self.project_root);
        paths.kaggle_config_dir = self.project_root.join(&self.kaggle_config_dir);
        paths
    }

    pub fn acquisition(&self) -> AcquisitionConfig {
        let paths = self.paths();
        AcquisitionConfig {
            dataset: self.kaggle_dataset.clone(),
            raw_dir: paths.raw_dir,
            file_name: RAW_DATASET_FILE.to_string(),
            kaggle_config_dir: paths.kaggle_config_dir,
        }
    }
}

pub const RAW_DATASET_FILE: &str = "AmesHousing.csv";

/// Every file the runs read or write, derived from the project root.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub raw_dir: PathBuf,
    pub raw_dataset: PathBuf,
    pub processed_dir: PathBuf,
    pub x_train: PathBuf,
    pub x_valid: PathBuf,
    pub y_train: PathBuf,
    pub y_valid: PathBuf,
    pub models_dir: PathBuf,
    pub preprocessor: PathBuf,
    pub best_model: PathBuf,
    pub figures_dir: PathBuf,
    pub prediction_plot: PathBuf,
    pub kaggle_config_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let raw_dir = root.join("data").join("raw");
        let processed_dir = root.join("data").join("processed");
        let models_dir = root.join("models");
        let figures_dir = root.join("reports").join("figures");
        ProjectPaths {
            raw_dataset: raw_dir.join(RAW_DATASET_FILE),
            x_train: processed_dir.join("X_train.bin"),
            x_valid: processed_dir.join("X_valid.bin"),
            y_train: processed_dir.join("y_train.bin"),
            y_valid: processed_dir.join("y_valid.bin"),
            preprocessor: models_dir.join("preprocessor.bin"),
            best_model: models_dir.join("best_model.bin"),
            prediction_plot: figures_dir.join("prediction_vs_actual.svg"),
            kaggle_config_dir: root.join(".kaggle"),
            raw_dir,
            processed_dir,
            models_dir,
            figures_dir,
            root,
        }
    }
}
