//! Session-refresh endpoint configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    /// URL of the session-refresh endpoint (POST).
    #[serde(default)]
    pub endpoint: String,

    /// Upper bound on a single refresh call. A timeout counts as a network failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Share one in-flight refresh between concurrent callers holding the same
    /// refresh token.
    #[serde(default = "default_true")]
    pub single_flight: bool,

    /// Refresh access tokens that expire within this many seconds.
    #[serde(default)]
    pub leeway_secs: u64,

    /// Send the `organizationId` claim of the current access token along with
    /// the refresh token.
    #[serde(default = "default_true")]
    pub include_organization: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            single_flight: true,
            leeway_secs: 0,
            include_organization: true,
        }
    }
}

impl RefreshConfig {
    /// Check if a refresh endpoint has been set.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }

    /// The endpoint, or an error naming the section when unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotConfigured` when no endpoint is set.
    pub fn require_endpoint(&self) -> Result<&str, ConfigError> {
        if self.is_configured() {
            Ok(self.endpoint.trim())
        } else {
            Err(ConfigError::NotConfigured {
                section: "refresh".into(),
            })
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
