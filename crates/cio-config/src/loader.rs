//! Configuration loader with file and environment variable support

use crate::{CioConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "customerio.toml",
    "./config/customerio.toml",
];

/// Environment variable pointing at an explicit config file
const CONFIG_PATH_ENV: &str = "CUSTOMERIO_CONFIG";

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<CioConfig, ConfigError> {
        self.load_with(|name| env::var(name).ok())
    }

    /// Same as [`load`](Self::load) but reads variables through `lookup`.
    pub fn load_with<F>(&self, lookup: F) -> Result<CioConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CioConfig::default();

        if let Some(path) = self.find_config_file(&lookup) {
            info!(?path, "Loading configuration from file");
            config = CioConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config, &lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Some(path) = lookup(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides<F>(&self, config: &mut CioConfig, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CUSTOMERIO_REGION") {
            config.region = val.parse()?;
        }

        // Credentials
        if let Some(val) = lookup("CUSTOMERIO_SITE_ID") {
            config.site_id = Some(val);
        }
        if let Some(val) = lookup("CUSTOMERIO_API_KEY") {
            config.api_key = Some(val);
        }
        if let Some(val) = lookup("CUSTOMERIO_APP_API_KEY") {
            config.app_api_key = Some(val);
        }
        if let Some(val) = lookup("CUSTOMERIO_WEBHOOK_SIGNING_KEY") {
            config.webhook_signing_key = Some(val);
        }

        // Endpoints
        if let Some(val) = lookup("CUSTOMERIO_TRACK_URL") {
            config.track.base_url = Some(val);
        }
        if let Some(val) = lookup("CUSTOMERIO_API_URL") {
            config.api.base_url = Some(val);
        }

        // HTTP
        if let Some(val) = lookup("CUSTOMERIO_TIMEOUT_SECS") {
            match val.parse() {
                Ok(secs) => config.http.timeout_secs = secs,
                Err(_) => warn!(value = %val, "Ignoring non-numeric CUSTOMERIO_TIMEOUT_SECS"),
            }
        }
        if let Some(val) = lookup("CUSTOMERIO_CONNECT_TIMEOUT_SECS") {
            match val.parse() {
                Ok(secs) => config.http.connect_timeout_secs = secs,
                Err(_) => {
                    warn!(value = %val, "Ignoring non-numeric CUSTOMERIO_CONNECT_TIMEOUT_SECS")
                }
            }
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
