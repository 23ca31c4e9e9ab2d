use std::sync::{Arc, Mutex, MutexGuard};

use http::HeaderMap;
use http::header::{COOKIE, HeaderValue, SET_COOKIE};
use keyfresh_config::CookieConfig;

use super::{StoredTokens, TokenPair, TokenStore, check_cookie_value};
use crate::clock::{Clock, SystemClock};
use crate::cookie::{Cookie, parse_cookie_header};
use crate::error::AuthError;

/// Request-scoped store for server-rendered code paths.
///
/// Reads come from the request's `Cookie` header, overlaid with any write or
/// clear made during the same request. Mutations are queued as `Set-Cookie`
/// values that the caller copies onto the response with [`Self::apply_to`].
pub struct ServerTokenStore {
    config: CookieConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<ServerState>,
}

#[derive(Default)]
struct ServerState {
    current: StoredTokens,
    pending: Vec<Cookie>,
}

impl ServerTokenStore {
    #[must_use]
    pub fn from_request(headers: &HeaderMap, config: CookieConfig) -> Self {
        Self::with_clock(headers, config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(headers: &HeaderMap, config: CookieConfig, clock: Arc<dyn Clock>) -> Self {
        let mut current = StoredTokens::default();
        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                tracing::debug!("skipping non-ASCII Cookie header");
                continue;
            };
            let mut cookies = parse_cookie_header(value);
            if current.access_token.is_none() {
                current.access_token = cookies.remove(&config.access_name).filter(|v| !v.is_empty());
            }
            if current.refresh_token.is_none() {
                current.refresh_token =
                    cookies.remove(&config.refresh_name).filter(|v| !v.is_empty());
            }
        }

        Self {
            config,
            clock,
            state: Mutex::new(ServerState {
                current,
                pending: Vec::new(),
            }),
        }
    }

    /// Cookies queued for the response, oldest first, one per name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` if the state lock is poisoned.
    pub fn pending_cookies(&self) -> Result<Vec<Cookie>, AuthError> {
        Ok(self.lock()?.pending.clone())
    }

    /// Queued mutations rendered as `Set-Cookie` header values.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenStoreError` if a cookie cannot be encoded as a
    /// header value.
    pub fn set_cookie_headers(&self) -> Result<Vec<HeaderValue>, AuthError> {
        self.lock()?
            .pending
            .iter()
            .map(|cookie| {
                HeaderValue::from_str(&cookie.to_string()).map_err(|e| {
                    AuthError::TokenStoreError(format!("Set-Cookie for '{}': {e}", cookie.name))
                })
            })
            .collect()
    }

    /// Append queued `Set-Cookie` headers to a response header map.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_cookie_headers`].
    pub fn apply_to(&self, response: &mut HeaderMap) -> Result<(), AuthError> {
        for value in self.set_cookie_headers()? {
            response.append(SET_COOKIE, value);
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ServerState>, AuthError> {
        self.state
            .lock()
            .map_err(|_| AuthError::TokenStoreError("server store lock poisoned".into()))
    }
}

impl ServerState {
    fn queue(&mut self, cookie: Cookie) {
        self.pending.retain(|c| c.name != cookie.name);
        self.pending.push(cookie);
    }
}

impl TokenStore for ServerTokenStore {
    fn read(&self) -> Result<StoredTokens, AuthError> {
        Ok(self.lock()?.current.clone())
    }

    fn write(&self, pair: &TokenPair) -> Result<(), AuthError> {
        check_cookie_value(&self.config.access_name, &pair.access_token)?;
        check_cookie_value(&self.config.refresh_name, &pair.refresh_token)?;

        let access = Cookie::with_config(&self.config.access_name, &pair.access_token, &self.config);
        let mut refresh =
            Cookie::with_config(&self.config.refresh_name, &pair.refresh_token, &self.config);
        refresh.expires = refresh_expiry(self.clock.as_ref(), self.config.refresh_max_age_days);

        let mut state = self.lock()?;
        state.queue(access);
        state.queue(refresh);
        state.current = pair.clone().into();
        tracing::debug!("queued Set-Cookie for token pair");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut state = self.lock()?;
        state.queue(Cookie::removal(&self.config.access_name, &self.config));
        state.queue(Cookie::removal(&self.config.refresh_name, &self.config));
        state.current = StoredTokens::default();
        tracing::debug!("queued Max-Age=0 for token pair");
        Ok(())
    }
}

pub(super) fn refresh_expiry(clock: &dyn Clock, days: u32) -> Option<chrono::DateTime<chrono::Utc>> {
    let now = chrono::DateTime::from_timestamp_millis(clock.now_millis())?;
    now.checked_add_signed(chrono::TimeDelta::days(i64::from(days)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use pretty_assertions::assert_eq;

    fn request_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).expect("header"));
        headers
    }

    fn store_at_epoch(headers: &HeaderMap) -> ServerTokenStore {
        ServerTokenStore::with_clock(headers, CookieConfig::default(), Arc::new(FixedClock::new(0)))
    }

    #[test]
    fn reads_tokens_from_cookie_header() {
        let store = store_at_epoch(&request_with_cookie(
            "theme=dark; access_token=at-1; refresh_token=rt-1",
        ));
        let tokens = store.read().expect("read");
        assert_eq!(tokens.access_token.as_deref(), Some("at-1"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
        assert!(store.pending_cookies().expect("pending").is_empty());
    }

    #[test]
    fn reads_across_multiple_cookie_headers() {
        let mut headers = request_with_cookie("access_token=at-1");
        headers.append(COOKIE, HeaderValue::from_static("refresh_token=rt-1"));
        let tokens = store_at_epoch(&headers).read().expect("read");
        assert_eq!(tokens.access_token.as_deref(), Some("at-1"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
    }

    #[test]
    fn missing_cookies_read_as_absent() {
        let tokens = store_at_epoch(&HeaderMap::new()).read().expect("read");
        assert!(tokens.is_empty());
    }

    #[test]
    fn write_emits_session_access_cookie_and_30_day_refresh_cookie() {
        let store = store_at_epoch(&HeaderMap::new());
        store.write(&TokenPair::new("at-new", "rt-new")).expect("write");

        let mut response = HeaderMap::new();
        store.apply_to(&mut response).expect("apply");
        let values: Vec<&str> = response
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().expect("ascii"))
            .collect();
        assert_eq!(
            values,
            vec![
                "access_token=at-new; Path=/; SameSite=Lax",
                "refresh_token=rt-new; Path=/; Expires=Sat, 31 Jan 1970 00:00:00 GMT; SameSite=Lax",
            ]
        );

        let tokens = store.read().expect("read after write");
        assert_eq!(tokens.access_token.as_deref(), Some("at-new"));
    }

    #[test]
    fn clear_emits_max_age_zero_for_both_keys() {
        let store = store_at_epoch(&request_with_cookie("access_token=at; refresh_token=rt"));
        store.clear().expect("clear");

        let values = store.set_cookie_headers().expect("headers");
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.to_str().is_ok_and(|s| s.contains("Max-Age=0"))));
        assert!(store.read().expect("read").is_empty());
    }

    #[test]
    fn clear_after_write_replaces_queued_cookies() {
        let store = store_at_epoch(&HeaderMap::new());
        store.write(&TokenPair::new("at", "rt")).expect("write");
        store.clear().expect("clear");
        store.clear().expect("clear again");

        let pending = store.pending_cookies().expect("pending");
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(Cookie::is_removal));
    }

    #[test]
    fn write_rejects_values_that_break_cookie_syntax() {
        let store = store_at_epoch(&HeaderMap::new());
        let result = store.write(&TokenPair::new("at; injected=1", "rt"));
        assert!(matches!(result, Err(AuthError::TokenStoreError(_))));
        assert!(store.pending_cookies().expect("pending").is_empty());
    }
}
