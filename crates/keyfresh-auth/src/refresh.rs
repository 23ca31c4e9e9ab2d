//! Exchange of a refresh token for a new token pair.
//!
//! One remote call per attempt, no retry. Success writes the new pair to the
//! caller's store; a failed refresh of an expired session clears it, forcing
//! re-authentication.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyfresh_config::{KeyfreshConfig, RefreshConfig};
use serde::{Deserialize, Serialize};

use crate::claims;
use crate::error::{AuthError, FailureCause};
use crate::flight::SingleFlight;
use crate::token_store::{TokenPair, TokenStore};

const MAX_LOGGED_BODY_CHARS: usize = 200;

/// Body of the session-refresh call.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

impl std::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("refresh_token", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

/// Transport for the session-refresh endpoint.
#[async_trait]
pub trait RefreshClient: Send + Sync {
    async fn refresh(&self, request: &RefreshRequest) -> Result<TokenPair, FailureCause>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// `POST`s the refresh request as JSON with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpRefreshClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    timeout: Duration,
}

impl HttpRefreshClient {
    /// # Errors
    ///
    /// Returns `AuthError::InvalidConfig` if the endpoint is not a valid URL or
    /// the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AuthError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| AuthError::InvalidConfig(format!("refresh endpoint '{endpoint}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidConfig` if no endpoint is configured or it is invalid.
    pub fn from_config(config: &RefreshConfig) -> Result<Self, AuthError> {
        Self::new(config.require_endpoint()?, config.timeout())
    }
}

#[async_trait]
impl RefreshClient for HttpRefreshClient {
    async fn refresh(&self, request: &RefreshRequest) -> Result<TokenPair, FailureCause> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| self.network_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
            tracing::debug!(status = status.as_u16(), body = %excerpt, "refresh endpoint rejected request");
            return Err(FailureCause::RefreshRejected {
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.network_error(&e))?;
        let parsed: RefreshResponse = serde_json::from_slice(&bytes)
            .map_err(|e| FailureCause::MalformedResponse(format!("parse refresh response: {e}")))?;
        if parsed.access_token.is_empty() {
            return Err(FailureCause::MalformedResponse(
                "refresh response has empty accessToken".into(),
            ));
        }

        Ok(TokenPair {
            access_token: parsed.access_token,
            refresh_token: parsed
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| request.refresh_token.clone()),
        })
    }
}

impl HttpRefreshClient {
    fn network_error(&self, error: &reqwest::Error) -> FailureCause {
        if error.is_timeout() {
            FailureCause::NetworkError(format!(
                "timed out after {}s",
                self.timeout.as_secs_f32()
            ))
        } else {
            FailureCause::NetworkError(error.to_string())
        }
    }
}

type RefreshOutcome = Result<TokenPair, FailureCause>;

/// Runs a refresh attempt and reconciles the caller's store with the outcome.
pub struct RefreshOrchestrator {
    client: Arc<dyn RefreshClient>,
    flights: Option<SingleFlight<RefreshOutcome>>,
    include_organization: bool,
}

impl RefreshOrchestrator {
    /// Single-flight enabled, organization forwarding enabled.
    #[must_use]
    pub fn new(client: Arc<dyn RefreshClient>) -> Self {
        Self {
            client,
            flights: Some(SingleFlight::new()),
            include_organization: true,
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidConfig` if the refresh endpoint is missing or invalid.
    pub fn from_config(config: &KeyfreshConfig) -> Result<Self, AuthError> {
        let client = HttpRefreshClient::from_config(&config.refresh)?;
        Ok(Self::new(Arc::new(client))
            .with_single_flight(config.refresh.single_flight)
            .with_organization(config.refresh.include_organization))
    }

    /// With single-flight off, concurrent callers each make their own call and
    /// the last write wins.
    #[must_use]
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(SingleFlight::new);
        self
    }

    #[must_use]
    pub const fn with_organization(mut self, enabled: bool) -> Self {
        self.include_organization = enabled;
        self
    }

    /// Exchange `refresh_token` for a new pair and return the new access token.
    ///
    /// `current_access_token` is only consulted for its organization claim.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated { NoRefreshToken }` without any network call or
    ///   store mutation when `refresh_token` is missing or empty.
    /// - `NotAuthenticated { .. }` after clearing `store` when the remote call
    ///   fails for any reason.
    /// - `TokenStoreError` if the new pair cannot be written.
    pub async fn refresh(
        &self,
        store: &dyn TokenStore,
        refresh_token: Option<&str>,
        current_access_token: Option<&str>,
    ) -> Result<String, AuthError> {
        let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
            return Err(FailureCause::NoRefreshToken.into());
        };

        match self.exchange(refresh_token, current_access_token).await {
            Ok(pair) => Self::store_pair(store, pair),
            Err(cause) => {
                tracing::warn!(%cause, "token refresh failed; clearing stored session");
                if let Err(error) = store.clear() {
                    tracing::warn!(%error, "failed to clear token store after refresh failure");
                }
                Err(cause.into())
            }
        }
    }

    /// Refresh a token that is still valid but close to expiry.
    ///
    /// Unlike [`Self::refresh`], a failed call leaves `store` untouched: the
    /// stored access token remains usable until it actually expires.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated { .. }` when the refresh token is empty or the
    ///   remote call fails. The store is not modified.
    /// - `TokenStoreError` if the new pair cannot be written.
    pub async fn refresh_ahead(
        &self,
        store: &dyn TokenStore,
        refresh_token: &str,
        current_access_token: Option<&str>,
    ) -> Result<String, AuthError> {
        if refresh_token.is_empty() {
            return Err(FailureCause::NoRefreshToken.into());
        }
        match self.exchange(refresh_token, current_access_token).await {
            Ok(pair) => Self::store_pair(store, pair),
            Err(cause) => {
                tracing::warn!(%cause, "early token refresh failed; keeping stored session");
                Err(cause.into())
            }
        }
    }

    async fn exchange(
        &self,
        refresh_token: &str,
        current_access_token: Option<&str>,
    ) -> RefreshOutcome {
        let organization_id = if self.include_organization {
            current_access_token
                .and_then(claims::decode)
                .and_then(|c| c.organization_id)
        } else {
            None
        };
        let request = RefreshRequest {
            refresh_token: refresh_token.to_owned(),
            organization_id,
        };

        match &self.flights {
            Some(flights) => {
                flights
                    .run(&flight_key(&request), || self.client.refresh(&request))
                    .await
            }
            None => self.client.refresh(&request).await,
        }
    }

    fn store_pair(store: &dyn TokenStore, pair: TokenPair) -> Result<String, AuthError> {
        store.write(&pair)?;
        let subject = claims::decode(&pair.access_token).map(|c| c.subject);
        tracing::info!(subject = ?subject, "access token refreshed");
        Ok(pair.access_token)
    }
}

/// Callers share a flight only when they would send the same request body.
/// Stored tokens never contain control characters, so `\u{1f}` cannot collide.
fn flight_key(request: &RefreshRequest) -> String {
    match &request.organization_id {
        Some(org) => format!("{}\u{1f}{org}", request.refresh_token),
        None => request.refresh_token.clone(),
    }
}
