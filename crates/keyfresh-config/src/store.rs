//! Client-side cookie jar location.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const JAR_DIR: &str = ".keyfresh";
const JAR_FILE_NAME: &str = "cookies.json";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Explicit jar file. Defaults to `~/.keyfresh/cookies.json`.
    #[serde(default)]
    pub jar_path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolve the jar file path, or `None` when no home directory exists.
    pub fn resolved_jar_path(&self) -> Option<PathBuf> {
        self.jar_path
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(JAR_DIR).join(JAR_FILE_NAME)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = StoreConfig {
            jar_path: Some(PathBuf::from("/tmp/jar.json")),
        };
        assert_eq!(
            config.resolved_jar_path(),
            Some(PathBuf::from("/tmp/jar.json"))
        );
    }

    #[test]
    fn default_path_is_under_home() {
        let config = StoreConfig::default();
        if let Some(path) = config.resolved_jar_path() {
            assert!(path.ends_with(".keyfresh/cookies.json"));
        }
    }
}
