//! Cookie naming and attribute configuration for the token pair.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// `SameSite` attribute applied to written cookies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

fn default_access_name() -> String {
    "access_token".into()
}

fn default_refresh_name() -> String {
    "refresh_token".into()
}

const fn default_refresh_max_age_days() -> u32 {
    30
}

fn default_path() -> String {
    "/".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CookieConfig {
    /// Cookie holding the access token (session-scoped).
    #[serde(default = "default_access_name")]
    pub access_name: String,

    /// Cookie holding the refresh token.
    #[serde(default = "default_refresh_name")]
    pub refresh_name: String,

    /// Lifetime of the refresh-token cookie, fixed at write time.
    #[serde(default = "default_refresh_max_age_days")]
    pub refresh_max_age_days: u32,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default)]
    pub same_site: SameSite,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub domain: Option<String>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            access_name: default_access_name(),
            refresh_name: default_refresh_name(),
            refresh_max_age_days: default_refresh_max_age_days(),
            path: default_path(),
            same_site: SameSite::default(),
            secure: false,
            domain: None,
        }
    }
}

impl CookieConfig {
    /// Reject settings that would make the two token entries collide or vanish.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_name.trim().is_empty() {
            return Err(invalid("cookies.access_name", "must not be empty"));
        }
        if self.refresh_name.trim().is_empty() {
            return Err(invalid("cookies.refresh_name", "must not be empty"));
        }
        if self.access_name == self.refresh_name {
            return Err(invalid(
                "cookies.refresh_name",
                "must differ from cookies.access_name",
            ));
        }
        if self.refresh_max_age_days == 0 {
            return Err(invalid("cookies.refresh_max_age_days", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = CookieConfig::default();
        assert_eq!(config.access_name, "access_token");
        assert_eq!(config.refresh_name, "refresh_token");
        assert_eq!(config.refresh_max_age_days, 30);
        assert_eq!(config.path, "/");
        assert_eq!(config.same_site, SameSite::Lax);
        assert!(!config.secure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn identical_names_are_rejected() {
        let config = CookieConfig {
            refresh_name: "access_token".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cookies.refresh_name"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let config = CookieConfig {
            access_name: " ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        let config = CookieConfig {
            refresh_max_age_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
