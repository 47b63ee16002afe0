//! Optional TOML configuration file.
//!
//! Lookup order: `--config <path>`, then `<config dir>/aws-ec-info/config.toml` when it
//! exists, then built-in defaults. Command line flags override file values.
//!
//! ```toml
//! profile = "prod"
//! max_concurrent_regions = 8
//! connect_timeout_secs = 5
//! operation_timeout_secs = 30
//!
//! [retry]
//! max_attempts = 5
//! base_delay_ms = 500
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::app::cache_explorer::aws_client::CoordinatorConfig;
use crate::app::cache_explorer::credentials::ClientSettings;
use crate::app::cache_explorer::retry::RetryPolicy;
use crate::app::error::EcInfoError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub profile: String,
    pub max_concurrent_regions: usize,
    pub connect_timeout_secs: u64,
    pub operation_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            max_concurrent_regions: 16,
            connect_timeout_secs: 10,
            operation_timeout_secs: 60,
            retry: RetryPolicy::default(),
        }
    }
}

impl QueryConfig {
    /// Default location, `None` when the platform has no config directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "", "aws-ec-info")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the explicit file, else the default file if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, EcInfoError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from_file(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, EcInfoError> {
        let config_error = |message: String| EcInfoError::Config {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: QueryConfig =
            toml::from_str(&content).map_err(|e| config_error(e.to_string()))?;

        if config.max_concurrent_regions == 0 {
            return Err(config_error(
                "max_concurrent_regions must be at least 1".to_string(),
            ));
        }

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            profile: self.profile.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            operation_timeout: Duration::from_secs(self.operation_timeout_secs),
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            max_concurrent_regions: self.max_concurrent_regions,
            retry_policy: self.retry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "profile = \"prod\"\n\n[retry]\nmax_attempts = 5").unwrap();

        let config = QueryConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.profile, "prod");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.max_concurrent_regions, 16);
        assert_eq!(config.client_settings().connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_file_is_a_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrent_regions = \"many\"").unwrap();
        assert!(matches!(
            QueryConfig::load(Some(file.path())),
            Err(EcInfoError::Config { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrent_regions = 0").unwrap();
        assert!(matches!(
            QueryConfig::load(Some(file.path())),
            Err(EcInfoError::Config { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(QueryConfig::load(Some(&missing)).is_err());
    }
}
