//! Dashboard configuration, read from JSON.

use crate::data::{PermitLoader, TableName};
use crate::stats::ViewOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "PERMIT_DASHBOARD_CONFIG";
/// Config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "permit_dashboard.json";

pub const DEFAULT_PERMITS_TABLE: &str = "LA_PERMIT_DATA.PUBLIC.PERMIT_RECORDS";
pub const DEFAULT_CENSUS_TABLE: &str = "LA_PERMIT_DATA.PUBLIC.CENSUS_TRACTS";

const DEFAULT_ESSENTIALS: [&str; 6] = [
    "Bldg-Alter/Repair",
    "Electrical",
    "Plumbing",
    "Bldg-Demolition",
    "Fire Sprinkler",
    "HVAC",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory holding one CSV per table.
    pub data_dir: PathBuf,
    pub permits_table: TableName,
    pub census_table: TableName,
    /// Reload the dataset once it is older than this; unset keeps it until refresh.
    pub cache_ttl_secs: Option<u64>,
    /// Permit types treated as basic construction needs.
    pub essential_types: Vec<String>,
    #[serde(flatten)]
    pub view: ViewOptions,
    pub export_width: u32,
    pub export_height: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            permits_table: TableName::new(DEFAULT_PERMITS_TABLE),
            census_table: TableName::new(DEFAULT_CENSUS_TABLE),
            cache_ttl_secs: None,
            essential_types: DEFAULT_ESSENTIALS.iter().map(|s| s.to_string()).collect(),
            view: ViewOptions::default(),
            export_width: 1400,
            export_height: 900,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Config named by [`CONFIG_ENV`], else [`DEFAULT_CONFIG_FILE`] if present,
    /// else defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            log::info!("Loading config from {}", Path::new(&path).display());
            return Self::load(path);
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            log::info!("Loading config from {}", local.display());
            return Self::load(local);
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn loader(&self) -> PermitLoader {
        PermitLoader::new(self.permits_table.clone(), self.census_table.clone())
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = DashboardConfig::from_json(
            r#"{ "data_dir": "/srv/permits", "top_n": 8, "cache_ttl_secs": 600 }"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/permits"));
        assert_eq!(config.view.top_n, 8);
        assert_eq!(config.view.composition_slices, 6);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(600)));
        assert_eq!(config.permits_table.as_str(), DEFAULT_PERMITS_TABLE);
        assert_eq!(config.essential_types.len(), 6);
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = DashboardConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn round_trips_through_json() {
        let config = DashboardConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(DashboardConfig::from_json(&json).unwrap(), config);
    }
}
