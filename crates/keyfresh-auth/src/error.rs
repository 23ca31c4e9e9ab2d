use thiserror::Error;

/// Why no valid access token could be produced.
///
/// Kept for logging and diagnostics only; callers should branch on
/// [`AuthError::is_unauthenticated`] rather than on the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    #[error("no refresh token available")]
    NoRefreshToken,

    #[error("access token could not be decoded")]
    DecodeFailure,

    #[error("refresh rejected with HTTP {status}")]
    RefreshRejected { status: u16 },

    #[error("refresh request failed: {0}")]
    NetworkError(String),

    #[error("refresh response unusable: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("not authenticated ({cause}) — sign in again")]
    NotAuthenticated { cause: FailureCause },

    #[error("token store error: {0}")]
    TokenStoreError(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuthError {
    /// True for the single "no valid access token" outcome.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated { .. })
    }

    #[must_use]
    pub const fn cause(&self) -> Option<&FailureCause> {
        match self {
            Self::NotAuthenticated { cause } => Some(cause),
            _ => None,
        }
    }
}

impl From<FailureCause> for AuthError {
    fn from(cause: FailureCause) -> Self {
        Self::NotAuthenticated { cause }
    }
}

impl From<keyfresh_config::ConfigError> for AuthError {
    fn from(error: keyfresh_config::ConfigError) -> Self {
        Self::InvalidConfig(error.to_string())
    }
}
