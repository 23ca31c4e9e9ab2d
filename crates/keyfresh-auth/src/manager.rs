use std::sync::Arc;

use keyfresh_config::KeyfreshConfig;
use serde::Serialize;

use crate::claims::{self, SessionIdentity};
use crate::error::{AuthError, FailureCause};
use crate::expiry::ExpiryPolicy;
use crate::refresh::RefreshOrchestrator;
use crate::token_store::{StoredTokens, TokenPair, TokenStore};

/// Snapshot of the stored session, for status display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub access_token_expired: bool,
    pub identity: Option<SessionIdentity>,
}

impl SessionStatus {
    #[must_use]
    pub fn from_tokens(stored: &StoredTokens, policy: &ExpiryPolicy) -> Self {
        let access = stored.access_token.as_deref();
        Self {
            has_access_token: access.is_some(),
            has_refresh_token: stored.refresh_token.is_some(),
            access_token_expired: policy.is_expired(access),
            identity: access.and_then(claims::decode).map(|c| c.to_identity()),
        }
    }
}

/// The entry point for obtaining a presently-valid access token.
///
/// Every call re-reads the store; nothing is cached between calls. Callers
/// that need one consistent token across a batch of requests should fetch
/// once and pass it down.
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    policy: ExpiryPolicy,
    orchestrator: Option<Arc<RefreshOrchestrator>>,
    leeway_secs: u64,
}

impl TokenManager {
    /// The orchestrator is shared so single-flight spans every manager built on it.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, orchestrator: Arc<RefreshOrchestrator>) -> Self {
        Self {
            store,
            policy: ExpiryPolicy::default(),
            orchestrator: Some(orchestrator),
            leeway_secs: 0,
        }
    }

    /// A manager that can inspect and edit the session but never refreshes.
    ///
    /// Valid stored tokens are still served; an expired one yields
    /// `AuthError::InvalidConfig` and leaves the store as it was.
    #[must_use]
    pub fn without_refresh(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            policy: ExpiryPolicy::default(),
            orchestrator: None,
            leeway_secs: 0,
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidConfig` if the refresh endpoint is missing or invalid.
    pub fn from_config(
        config: &KeyfreshConfig,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, AuthError> {
        let orchestrator = Arc::new(RefreshOrchestrator::from_config(config)?);
        Ok(Self::new(store, orchestrator).with_leeway(config.refresh.leeway_secs))
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Refresh tokens that expire within `secs` instead of waiting for expiry.
    ///
    /// A token inside this window is still valid: if the early refresh is not
    /// possible or fails, the stored token is returned as is.
    #[must_use]
    pub const fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    fn orchestrator(&self) -> Result<&RefreshOrchestrator, AuthError> {
        self.orchestrator
            .as_deref()
            .ok_or_else(|| AuthError::InvalidConfig("refresh endpoint not configured".into()))
    }

    /// Return a fresh access token, refreshing if the stored one is stale.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when no valid token can be
    /// produced (missing refresh token, rejected or failed refresh),
    /// `AuthError::InvalidConfig` when a refresh is needed but this manager
    /// has no endpoint, and `AuthError::TokenStoreError` on storage failure.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let stored = self.store.read()?;

        if let Some(access) = stored.access_token.as_deref() {
            if !self.policy.is_expired(Some(access)) {
                if !self.policy.expires_within(Some(access), self.leeway_secs) {
                    tracing::debug!("stored access token still valid");
                    return Ok(access.to_owned());
                }
                return self
                    .refresh_ahead(access, stored.refresh_token.as_deref())
                    .await;
            }
            if claims::decode(access).is_none() {
                tracing::debug!(cause = %FailureCause::DecodeFailure, "stored access token unusable");
            }
        }

        let Some(refresh) = stored.refresh_token.as_deref() else {
            tracing::debug!(cause = %FailureCause::NoRefreshToken, "cannot refresh access token");
            return Err(FailureCause::NoRefreshToken.into());
        };

        self.orchestrator()?
            .refresh(self.store.as_ref(), Some(refresh), stored.access_token.as_deref())
            .await
    }

    async fn refresh_ahead(&self, access: &str, refresh: Option<&str>) -> Result<String, AuthError> {
        let (Some(refresh), Some(orchestrator)) = (
            refresh.filter(|t| !t.is_empty()),
            self.orchestrator.as_deref(),
        ) else {
            tracing::debug!("access token near expiry; serving it without early refresh");
            return Ok(access.to_owned());
        };

        match orchestrator
            .refresh_ahead(self.store.as_ref(), refresh, Some(access))
            .await
        {
            Err(error) if error.is_unauthenticated() => Ok(access.to_owned()),
            result => result,
        }
    }

    /// Refresh now, whatever the state of the stored access token.
    ///
    /// # Errors
    ///
    /// Same as [`Self::access_token`].
    pub async fn force_refresh(&self) -> Result<String, AuthError> {
        let stored = self.store.read()?;
        self.orchestrator()?
            .refresh(
                self.store.as_ref(),
                stored.refresh_token.as_deref(),
                stored.access_token.as_deref(),
            )
            .await
    }

    /// Store a freshly issued pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` if the pair cannot be persisted.
    pub fn sign_in(&self, pair: &TokenPair) -> Result<(), AuthError> {
        self.store.write(pair)?;
        let subject = claims::decode(&pair.access_token).map(|c| c.subject);
        tracing::info!(subject = ?subject, "session stored");
        Ok(())
    }

    /// Erase the stored session. Safe to call when already signed out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` if the store cannot be cleared.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        tracing::info!("session cleared");
        Ok(())
    }

    /// Decoded claims of the stored access token, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` on storage failure.
    pub fn identity(&self) -> Result<Option<SessionIdentity>, AuthError> {
        let stored = self.store.read()?;
        Ok(stored
            .access_token
            .as_deref()
            .and_then(claims::decode)
            .map(|c| c.to_identity()))
    }

    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` on storage failure.
    pub fn status(&self) -> Result<SessionStatus, AuthError> {
        Ok(SessionStatus::from_tokens(&self.store.read()?, &self.policy))
    }
}
