use crate::error::{AcquisitionError, AcquisitionResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1";
const CREDENTIALS_FILE: &str = "kaggle.json";

/// Kaggle API username and key.
#[derive(Clone, Deserialize, PartialEq)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl std::fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl KaggleCredentials {
    /// `KAGGLE_USERNAME` / `KAGGLE_KEY` win; otherwise `kaggle.json` in `config_dir`.
    pub fn resolve(config_dir: &Path) -> AcquisitionResult<Self> {
        Self::resolve_with(config_dir, process_env)
    }

    /// Same as [`KaggleCredentials::resolve`] with an injectable variable lookup.
    pub fn resolve_with(
        config_dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> AcquisitionResult<Self> {
        let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        if let (Some(username), Some(key)) = (non_empty("KAGGLE_USERNAME"), non_empty("KAGGLE_KEY")) {
            debug!("using Kaggle credentials from the environment");
            return Ok(KaggleCredentials { username, key });
        }

        let path = config_dir.join(CREDENTIALS_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AcquisitionError::MissingCredentials { path })
            }
            Err(source) => return Err(AcquisitionError::Io { path, source }),
        };
        let creds: KaggleCredentials = serde_json::from_str(&text)
            .map_err(|source| AcquisitionError::InvalidCredentials { path: path.clone(), source })?;
        if creds.username.is_empty() || creds.key.is_empty() {
            return Err(AcquisitionError::MissingCredentials { path });
        }
        debug!(path = %path.display(), "using Kaggle credentials file");
        Ok(creds)
    }
}

/// Something that can hand over a dataset's zip archive.
pub trait ArchiveSource {
    /// Raw bytes of the zip archive for `dataset` (`owner/slug`).
    fn fetch_archive(&self, dataset: &str) -> AcquisitionResult<Vec<u8>>;
}

/// Environment variable lookup used to find credentials.
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Kaggle public API client (blocking).
pub struct KaggleApi {
    base_url: String,
    config_dir: PathBuf,
    timeout: Duration,
    env: EnvLookup,
}

impl KaggleApi {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        KaggleApi {
            base_url: KAGGLE_API_BASE.to_string(),
            config_dir: config_dir.into(),
            timeout: Duration::from_secs(300),
            env: process_env,
        }
    }

    /// Read credential variables through `env` instead of the process environment.
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn download_url(&self, dataset: &str) -> String {
        format!("{}/datasets/download/{}", self.base_url.trim_end_matches('/'), dataset)
    }
}

impl ArchiveSource for KaggleApi {
    fn fetch_archive(&self, dataset: &str) -> AcquisitionResult<Vec<u8>> {
        let creds = KaggleCredentials::resolve_with(&self.config_dir, self.env)?;
        let url = self.download_url(dataset);
        let http = |source| AcquisitionError::Http {
            url: url.clone(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(http)?;

        info!(%url, user = %creds.username, "downloading dataset archive");
        let response = client
            .get(&url)
            .basic_auth(&creds.username, Some(&creds.key))
            .send()
            .map_err(http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(http)?;
        info!(bytes = bytes.len(), "download complete");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_environment_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kaggle.json"), r#"{"username":"file","key":"f"}"#).unwrap();

        let env = |name: &str| match name {
            "KAGGLE_USERNAME" => Some("env-user".to_string()),
            "KAGGLE_KEY" => Some("env-key".to_string()),
            _ => None,
        };
        let creds = KaggleCredentials::resolve_with(dir.path(), env).unwrap();
        assert_eq!(creds.username, "env-user");
    }

    #[test]
    fn test_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kaggle.json"), r#"{"username":"alice","key":"s3cret"}"#).unwrap();
        let creds = KaggleCredentials::resolve_with(dir.path(), no_env).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.key, "s3cret");
        assert!(!format!("{:?}", creds).contains("s3cret"));
    }

    #[test]
    fn test_missing_and_invalid_credentials() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            KaggleCredentials::resolve_with(dir.path(), no_env),
            Err(AcquisitionError::MissingCredentials { .. })
        ));

        std::fs::write(dir.path().join("kaggle.json"), "not json").unwrap();
        assert!(matches!(
            KaggleCredentials::resolve_with(dir.path(), no_env),
            Err(AcquisitionError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn test_download_url() {
        let api = KaggleApi::new(".kaggle").with_base_url("http://localhost:9/api/v1/");
        assert_eq!(
            api.download_url("prevek18/ames-housing-dataset"),
            "http://localhost:9/api/v1/datasets/download/prevek18/ames-housing-dataset"
        );
    }
}
