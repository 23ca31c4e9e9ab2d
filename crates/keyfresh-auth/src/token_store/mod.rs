//! Persistence of the access/refresh token pair.
//!
//! [`TokenStore`] is the only path by which the stored session is mutated.
//! Implementations:
//! - [`MemoryTokenStore`]: in-process, for tests and embedding.
//! - [`ServerTokenStore`]: one per incoming request; reads the `Cookie`
//!   header and queues `Set-Cookie` values for the response.
//! - [`ClientTokenStore`]: the ambient cookie jar, persisted to disk.

mod client;
mod server;

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub use client::{ClientTokenStore, CookieJar};
pub use server::ServerTokenStore;

/// Access and refresh tokens issued together by the authentication server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Whatever the store currently holds. Either half may be missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredTokens {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<TokenPair> for StoredTokens {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
        }
    }
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &self.access_token.as_ref().map(|_| "<present>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<present>"))
            .finish()
    }
}

pub trait TokenStore: Send + Sync {
    /// Present values only; absence is never an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` on an underlying I/O failure.
    fn read(&self) -> Result<StoredTokens, AuthError>;

    /// Persist both values, replacing whatever was stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` on an underlying I/O failure.
    fn write(&self, pair: &TokenPair) -> Result<(), AuthError>;

    /// Remove both entries. Clearing an empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` on an underlying I/O failure.
    fn clear(&self) -> Result<(), AuthError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<StoredTokens>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoredTokens>, AuthError> {
        self.tokens
            .lock()
            .map_err(|_| AuthError::TokenStoreError("memory store lock poisoned".into()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Result<StoredTokens, AuthError> {
        Ok(self.lock()?.clone())
    }

    fn write(&self, pair: &TokenPair) -> Result<(), AuthError> {
        *self.lock()? = pair.clone().into();
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.lock()? = StoredTokens::default();
        Ok(())
    }
}

/// Reject values that cannot travel inside a cookie unescaped.
pub(crate) fn check_cookie_value(name: &str, value: &str) -> Result<(), AuthError> {
    if value
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, ';' | ',' | '"' | '\\'))
    {
        return Err(AuthError::TokenStoreError(format!(
            "value for cookie '{name}' contains characters not allowed in a cookie"
        )));
    }
    Ok(())
}
