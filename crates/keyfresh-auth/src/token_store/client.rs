use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use keyfresh_config::{CookieConfig, KeyfreshConfig};
use serde::{Deserialize, Serialize};

use super::server::refresh_expiry;
use super::{StoredTokens, TokenPair, TokenStore, check_cookie_value};
use crate::clock::{Clock, SystemClock};
use crate::error::AuthError;

/// Named cookie entries with optional absolute expiry.
///
/// An entry without `expires_at` lives for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieJar {
    entries: BTreeMap<String, JarEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct JarEntry {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl CookieJar {
    /// The live value for `name`, ignoring entries expired at `now`.
    #[must_use]
    pub fn get(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.entries
            .get(name)
            .filter(|entry| entry.expires_at.is_none_or(|at| at > now))
            .map(|entry| entry.value.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str, expires_at: Option<DateTime<Utc>>) {
        self.entries.insert(
            name.to_owned(),
            JarEntry {
                value: value.to_owned(),
                expires_at,
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Drop every entry expired at `now`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.entries
            .retain(|_, entry| entry.expires_at.is_none_or(|at| at > now));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Store backed by the client's cookie jar.
///
/// When opened with a path, every mutation is flushed to a JSON file with
/// owner-only permissions.
pub struct ClientTokenStore {
    config: CookieConfig,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    jar: Mutex<CookieJar>,
}

impl ClientTokenStore {
    /// Open the jar configured in `config.store`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` if no jar path can be resolved.
    pub fn ambient(config: &KeyfreshConfig) -> Result<Self, AuthError> {
        let path = config.store.resolved_jar_path().ok_or_else(|| {
            AuthError::TokenStoreError("home directory not found; cannot locate cookie jar".into())
        })?;
        Ok(Self::open(path, config.cookies.clone()))
    }

    /// Open a file-backed jar. A missing or unreadable file starts an empty jar.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, config: CookieConfig) -> Self {
        let path = path.into();
        let jar = load_jar(&path);
        Self {
            config,
            path: Some(path),
            clock: Arc::new(SystemClock),
            jar: Mutex::new(jar),
        }
    }

    /// A jar that lives only as long as this value.
    #[must_use]
    pub fn in_memory(config: CookieConfig) -> Self {
        Self {
            config,
            path: None,
            clock: Arc::new(SystemClock),
            jar: Mutex::new(CookieJar::default()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of the underlying jar.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` if the jar lock is poisoned.
    pub fn jar(&self) -> Result<CookieJar, AuthError> {
        Ok(self.lock()?.clone())
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_millis()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CookieJar>, AuthError> {
        self.jar
            .lock()
            .map_err(|_| AuthError::TokenStoreError("cookie jar lock poisoned".into()))
    }

    /// Save `next` and only then make it the live jar, so a failed save
    /// leaves memory and disk agreeing on the previous state.
    fn commit(&self, jar: &mut CookieJar, mut next: CookieJar) -> Result<(), AuthError> {
        next.prune(self.now());
        if let Some(path) = &self.path {
            save_jar(path, &next)?;
        }
        *jar = next;
        Ok(())
    }
}

impl TokenStore for ClientTokenStore {
    fn read(&self) -> Result<StoredTokens, AuthError> {
        let now = self.now();
        let jar = self.lock()?;
        Ok(StoredTokens {
            access_token: jar.get(&self.config.access_name, now).map(str::to_owned),
            refresh_token: jar.get(&self.config.refresh_name, now).map(str::to_owned),
        })
    }

    fn write(&self, pair: &TokenPair) -> Result<(), AuthError> {
        check_cookie_value(&self.config.access_name, &pair.access_token)?;
        check_cookie_value(&self.config.refresh_name, &pair.refresh_token)?;

        let refresh_expires = refresh_expiry(self.clock.as_ref(), self.config.refresh_max_age_days);
        let mut jar = self.lock()?;
        let mut next = jar.clone();
        next.set(&self.config.access_name, &pair.access_token, None);
        next.set(&self.config.refresh_name, &pair.refresh_token, refresh_expires);
        self.commit(&mut jar, next)?;
        tracing::debug!(path = ?self.path, "token pair written to cookie jar");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut jar = self.lock()?;
        let mut next = jar.clone();
        let removed =
            next.remove(&self.config.access_name) | next.remove(&self.config.refresh_name);
        if removed || self.path.as_ref().is_some_and(|p| p.exists()) {
            self.commit(&mut jar, next)?;
        }
        tracing::debug!(removed, "cookie jar cleared");
        Ok(())
    }
}

fn load_jar(path: &Path) -> CookieJar {
    let Ok(content) = fs::read_to_string(path) else {
        return CookieJar::default();
    };
    if content.trim().is_empty() {
        return CookieJar::default();
    }
    serde_json::from_str(&content).unwrap_or_else(|error| {
        tracing::warn!(%error, path = %path.display(), "cookie jar unreadable; starting empty");
        CookieJar::default()
    })
}

fn save_jar(path: &Path, jar: &CookieJar) -> Result<(), AuthError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| AuthError::TokenStoreError(format!("mkdir {}: {e}", parent.display())))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
                tracing::warn!("failed to chmod 0700 {}: {e}", parent.display());
            }
        }
    }

    let json = serde_json::to_string_pretty(jar)
        .map_err(|e| AuthError::TokenStoreError(format!("serialize cookie jar: {e}")))?;

    // Readers see either the old jar or the new one, never a partial write.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .map_err(|e| AuthError::TokenStoreError(format!("write {}: {e}", tmp.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)) {
            let _ = fs::remove_file(&tmp);
            return Err(AuthError::TokenStoreError(format!("chmod {}: {e}", tmp.display())));
        }
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AuthError::TokenStoreError(format!("rename {}: {e}", path.display()))
    })
}
