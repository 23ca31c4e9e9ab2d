//! # keyfresh-auth
//!
//! Access/refresh token lifecycle management.
//!
//! - [`token_store`]: persistence of the token pair (in-memory, request-scoped
//!   server cookies, or the client's on-disk cookie jar).
//! - [`claims`]: unverified decoding of access-token claims.
//! - [`expiry`]: fail-safe expiry classification.
//! - [`refresh`]: the remote refresh exchange and store reconciliation.
//! - [`manager`]: [`TokenManager`], the façade that hands out fresh tokens.
//!
//! ```no_run
//! # async fn demo() -> Result<(), keyfresh_auth::AuthError> {
//! use std::sync::Arc;
//! use keyfresh_auth::{ClientTokenStore, TokenManager};
//!
//! let config = keyfresh_config::KeyfreshConfig::load()?;
//! let store = Arc::new(ClientTokenStore::ambient(&config)?);
//! let manager = TokenManager::from_config(&config, store)?;
//!
//! match manager.access_token().await {
//!     Ok(token) => println!("Bearer {token}"),
//!     Err(error) if error.is_unauthenticated() => println!("sign in again"),
//!     Err(error) => return Err(error),
//! }
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod clock;
pub mod cookie;
pub mod error;
pub mod expiry;
pub mod flight;
pub mod manager;
pub mod refresh;
pub mod token_store;

pub use claims::{DecodedClaims, SessionIdentity};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AuthError, FailureCause};
pub use expiry::ExpiryPolicy;
pub use manager::{SessionStatus, TokenManager};
pub use refresh::{HttpRefreshClient, RefreshClient, RefreshOrchestrator, RefreshRequest};
pub use token_store::{
    ClientTokenStore, MemoryTokenStore, ServerTokenStore, StoredTokens, TokenPair, TokenStore,
};
