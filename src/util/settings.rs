use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

use crate::domain::{StatsConfig, DEFAULT_SAMPLE_SIZE, OUTLIER_THRESHOLD};
use crate::infra::catalog::default_catalog_path;
use crate::infra::universalis::{
    UniversalisClient, UniversalisError, DEFAULT_BASE_URL, DEFAULT_LISTINGS, DEFAULT_MAX_ATTEMPTS,
};
use crate::util::logging::LoggingConfig;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "CraftOrBuy";
const APP_NAME: &str = "CraftOrBuy";
const SETTINGS_FILE: &str = "settings.json";
const FIRST_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// World, data center or region queried on Universalis.
    pub scope: String,
    pub base_url: String,
    pub listings_per_request: u32,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub sample_size: usize,
    pub outlier_threshold: f64,
    pub catalog_path: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scope: "Japan".into(),
            base_url: DEFAULT_BASE_URL.into(),
            listings_per_request: DEFAULT_LISTINGS,
            request_timeout_secs: 30,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sample_size: DEFAULT_SAMPLE_SIZE,
            outlier_threshold: OUTLIER_THRESHOLD,
            catalog_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig {
            sample_size: self.sample_size.max(1),
            outlier_threshold: self.outlier_threshold,
        }
    }

    pub fn client(&self) -> Result<UniversalisClient, UniversalisError> {
        let timeout = Duration::from_secs(self.request_timeout_secs.max(1));
        Ok(UniversalisClient::with_timeout(&self.base_url, timeout)?
            .with_listings(self.listings_per_request)
            .with_retries(self.max_attempts, FIRST_RETRY_DELAY))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path.clone().unwrap_or_else(default_catalog_path)
    }
}

pub fn settings_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

/// Reads settings from `path`, or from the platform config directory when
/// `path` is `None`. A missing file yields the defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match settings_file() {
            Some(path) => path,
            None => return Ok(Settings::default()),
        },
    };

    let data = match fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        Err(err) => return Err(err.into()),
    };

    Ok(serde_json::from_str(&data)?)
}

/// Writes `settings` as pretty JSON and returns the path written.
pub fn save_settings(settings: &Settings, path: Option<&Path>) -> Result<PathBuf, SettingsError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => settings_file().ok_or(SettingsError::StorageUnavailable)?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json)?;
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}
