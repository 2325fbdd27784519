//! Customer.io client configuration
//!
//! This crate provides TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;
mod region;

pub use loader::ConfigLoader;
pub use region::Region;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CioConfig {
    /// Data center of the workspace
    pub region: Region,

    /// Track API site id (basic-auth username)
    pub site_id: Option<String>,

    /// Track API key (basic-auth password)
    pub api_key: Option<String>,

    /// App API key used as bearer token for transactional messages
    pub app_api_key: Option<String>,

    /// Webhook signing key for reporting webhooks
    pub webhook_signing_key: Option<String>,

    pub track: TrackSettings,
    pub api: ApiSettings,
    pub http: HttpSettings,
}

/// Track API endpoint settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    /// Host override (defaults to the region's track host)
    pub host: Option<String>,
    /// Port override (443 is left out of the URL)
    pub port: Option<u16>,
    /// Path prefix for v1 calls (defaults to `api/v1`)
    pub url_prefix: Option<String>,
    /// Full base URL including scheme; wins over host/port when set
    pub base_url: Option<String>,
}

/// App API endpoint settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Full base URL including scheme (defaults to `https://<region api host>`)
    pub base_url: Option<String>,
}

/// HTTP transport settings shared by every client session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Total request timeout in seconds
    pub timeout_secs: u64,
    /// Connection establishment timeout in seconds
    pub connect_timeout_secs: u64,
    /// Maximum concurrent in-flight requests per session
    pub max_connections: usize,
    /// Maximum idle keep-alive connections kept per host
    pub max_keepalive_connections: usize,
    /// User-Agent override
    pub user_agent: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_connections: 100,
            max_keepalive_connections: 20,
            user_agent: None,
        }
    }
}

impl CioConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: CioConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load()
    }

    /// Check limits and timeouts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.http.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "http.max_connections must be greater than zero".to_string(),
            ));
        }
        if self.http.max_keepalive_connections > self.http.max_connections {
            return Err(ConfigError::ValidationError(
                "http.max_keepalive_connections cannot exceed http.max_connections".to_string(),
            ));
        }
        if let Some(port) = self.track.port {
            if port == 0 {
                return Err(ConfigError::ValidationError(
                    "track.port must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Customer.io client configuration
# Environment variables (CUSTOMERIO_*) override these settings

region = "us"  # us or eu
site_id = ""
api_key = ""
app_api_key = ""
webhook_signing_key = ""

[track]
# host = "track.customer.io"
# port = 443
# url_prefix = "api/v1"
# base_url = "https://track.customer.io"

[api]
# base_url = "https://api.customer.io"

[http]
timeout_secs = 30
connect_timeout_secs = 10
max_connections = 100
max_keepalive_connections = 20
# user_agent = "my-app/1.0"
"#
        .to_string()
    }
}
