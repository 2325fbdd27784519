//! Client configuration

use crate::error::{Error, Result};
use cio_config::{CioConfig, HttpSettings, Region};
use std::time::Duration;

/// Default User-Agent: `<library-name>/<version>`
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Default maximum number of concurrent in-flight requests per session
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Default maximum number of idle keep-alive connections per host
pub const DEFAULT_MAX_KEEPALIVE_CONNECTIONS: usize = 20;

const DEFAULT_TRACK_PREFIX: &[&str] = &["api", "v1"];
const TRACK_V2_PREFIX: &[&str] = &["api", "v2"];
const API_PREFIX: &[&str] = &["v1"];

/// Transport configuration for a [`ClientSession`](crate::ClientSession)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Total request timeout
    pub timeout: Duration,

    /// Connection establishment timeout
    pub connect_timeout: Duration,

    /// Maximum concurrent in-flight requests; excess callers wait for a slot
    pub max_connections: usize,

    /// Maximum idle keep-alive connections kept per host
    pub max_keepalive_connections: usize,

    /// User agent string
    pub user_agent: String,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_keepalive_connections: DEFAULT_MAX_KEEPALIVE_CONNECTIONS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set connection limits
    pub fn with_limits(mut self, max_connections: usize, max_keepalive_connections: usize) -> Self {
        self.max_connections = max_connections;
        self.max_keepalive_connections = max_keepalive_connections;
        self
    }

    /// Set custom user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&HttpSettings> for SessionConfig {
    fn from(settings: &HttpSettings) -> Self {
        let mut config = SessionConfig::new()
            .with_timeout(Duration::from_secs(settings.timeout_secs))
            .with_connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .with_limits(settings.max_connections, settings.max_keepalive_connections);
        if let Some(user_agent) = &settings.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        config
    }
}

/// Configuration for the Track API client
#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Site id, used as the basic-auth username
    pub site_id: String,

    /// API key, used as the basic-auth password
    pub api_key: String,

    pub region: Region,

    /// Host override (defaults to the region's track host)
    pub host: Option<String>,

    /// Port override; 443 is left out of the URL
    pub port: Option<u16>,

    /// Path prefix for v1 calls (defaults to `api/v1`)
    pub url_prefix: Option<String>,

    /// Full base URL including scheme, wins over host and port
    pub base_url: Option<String>,

    pub session: SessionConfig,
}

impl TrackConfig {
    pub fn new(site_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            api_key: api_key.into(),
            region: Region::Us,
            host: None,
            port: None,
            url_prefix: None,
            base_url: None,
            session: SessionConfig::new(),
        }
    }

    /// Build from loaded settings; site id and API key are required
    pub fn from_settings(settings: &CioConfig) -> Result<Self> {
        let site_id = settings
            .site_id
            .clone()
            .ok_or_else(|| Error::Config("site_id is not configured".to_string()))?;
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("api_key is not configured".to_string()))?;

        Ok(Self {
            site_id,
            api_key,
            region: settings.region,
            host: settings.track.host.clone(),
            port: settings.track.port,
            url_prefix: settings.track.url_prefix.clone(),
            base_url: settings.track.base_url.clone(),
            session: SessionConfig::from(&settings.http),
        })
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Base URL the session joins paths against
    pub fn get_base_url(&self) -> String {
        if let Some(base_url) = &self.base_url {
            return base_url.clone();
        }

        let host = self.host.as_deref().unwrap_or(self.region.track_host());
        let host = match host.split_once("://") {
            Some((_, rest)) => rest,
            None => host,
        };
        let host = host.trim_matches('/');

        match self.port {
            Some(port) if port != 443 => format!("https://{}:{}", host, port),
            _ => format!("https://{}", host),
        }
    }

    /// Path segments in front of every v1 endpoint
    pub fn v1_prefix(&self) -> Vec<String> {
        match &self.url_prefix {
            Some(prefix) => split_prefix(prefix),
            None => DEFAULT_TRACK_PREFIX.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Path segments in front of the v2 entity and batch endpoints
    pub fn v2_prefix(&self) -> Vec<String> {
        TRACK_V2_PREFIX.iter().map(|s| s.to_string()).collect()
    }
}

/// Configuration for the App (transactional messaging) API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// App API key, sent as a bearer token
    pub key: String,

    pub region: Region,

    /// Full base URL including scheme (defaults to `https://<region api host>`)
    pub base_url: Option<String>,

    pub session: SessionConfig,
}

impl ApiConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            region: Region::Us,
            base_url: None,
            session: SessionConfig::new(),
        }
    }

    /// Build from loaded settings; the app API key is required
    pub fn from_settings(settings: &CioConfig) -> Result<Self> {
        let key = settings
            .app_api_key
            .clone()
            .ok_or_else(|| Error::Config("app_api_key is not configured".to_string()))?;

        Ok(Self {
            key,
            region: settings.region,
            base_url: settings.api.base_url.clone(),
            session: SessionConfig::from(&settings.http),
        })
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn get_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.region.api_host()))
    }

    pub fn prefix(&self) -> Vec<String> {
        API_PREFIX.iter().map(|s| s.to_string()).collect()
    }
}

fn split_prefix(prefix: &str) -> Vec<String> {
    prefix
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
