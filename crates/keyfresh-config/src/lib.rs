//! # keyfresh-config
//!
//! Layered configuration loading for keyfresh using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`KEYFRESH_*` prefix, `__` as separator)
//! 2. Project-level `.keyfresh/config.toml`
//! 3. User-level `~/.config/keyfresh/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `KEYFRESH_REFRESH__ENDPOINT` -> `refresh.endpoint`,
//! `KEYFRESH_COOKIES__SAME_SITE` -> `cookies.same_site`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use keyfresh_config::KeyfreshConfig;
//!
//! let config = KeyfreshConfig::load_with_dotenv().expect("config");
//!
//! if config.refresh.is_configured() {
//!     println!("refresh endpoint: {}", config.refresh.endpoint);
//! }
//! ```

mod cookies;
mod error;
mod refresh;
mod store;

pub use cookies::{CookieConfig, SameSite};
pub use error::ConfigError;
pub use refresh::RefreshConfig;
pub use store::StoreConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeyfreshConfig {
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl KeyfreshConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` on malformed sources and
    /// `ConfigError::InvalidValue` when cookie settings are unusable.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Extract and validate from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.cookies.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".keyfresh/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("KEYFRESH_").split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keyfresh").join("config.toml"))
    }

    /// Load `.env` by walking up from `CARGO_MANIFEST_DIR`, else the current dir.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
