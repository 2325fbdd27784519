//! Customer.io data-center regions

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data center a workspace lives in. Selects the Track and App API hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn name(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Eu => "eu",
        }
    }

    /// Host serving the Track API (v1 and v2)
    pub fn track_host(&self) -> &'static str {
        match self {
            Region::Us => "track.customer.io",
            Region::Eu => "track-eu.customer.io",
        }
    }

    /// Host serving the App (transactional messaging) API
    pub fn api_host(&self) -> &'static str {
        match self {
            Region::Us => "api.customer.io",
            Region::Eu => "api-eu.customer.io",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Region::Us),
            "eu" => Ok(Region::Eu),
            other => Err(ConfigError::ValidationError(format!(
                "invalid region provided: {}",
                other
            ))),
        }
    }
}
