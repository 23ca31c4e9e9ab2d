use std::sync::Arc;

use crate::claims;
use crate::clock::{Clock, SystemClock};

/// Classifies access tokens as valid or expired.
///
/// Fails safe: a missing, undecodable, or `exp`-less token is expired. No
/// leeway is applied here; see [`ExpiryPolicy::expires_within`].
#[derive(Clone)]
pub struct ExpiryPolicy {
    clock: Arc<dyn Clock>,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for ExpiryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryPolicy")
            .field("now_millis", &self.clock.now_millis())
            .finish()
    }
}

impl ExpiryPolicy {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Current time in whole epoch seconds.
    #[must_use]
    pub fn now_epoch_secs(&self) -> i64 {
        self.clock.now_millis().div_euclid(1000)
    }

    /// `true` iff the token is absent, undecodable, has no `exp`, or
    /// `now >= exp`.
    #[must_use]
    pub fn is_expired(&self, token: Option<&str>) -> bool {
        self.expires_within(token, 0)
    }

    /// Like [`Self::is_expired`], but also `true` when expiry falls within
    /// `leeway_secs` from now.
    #[must_use]
    pub fn expires_within(&self, token: Option<&str>, leeway_secs: u64) -> bool {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return true;
        };
        let Some(exp) = claims::decode(token).and_then(|c| c.expires_at_epoch_secs) else {
            return true;
        };
        let leeway = i64::try_from(leeway_secs).unwrap_or(i64::MAX);
        self.now_epoch_secs().saturating_add(leeway) >= exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use base64::Engine as _;
    use rstest::rstest;

    fn make_jwt_with_exp(exp: i64) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.{}",
            engine.encode(r#"{"alg":"RS256"}"#),
            engine.encode(format!(r#"{{"sub":"user_123","exp":{exp}}}"#)),
            engine.encode("fake_sig")
        )
    }

    fn policy_at(millis: i64) -> ExpiryPolicy {
        ExpiryPolicy::new(Arc::new(FixedClock::new(millis)))
    }

    #[rstest]
    #[case::before(999_999, false)]
    #[case::just_before_second(999_000, false)]
    #[case::exact_boundary(1_000_000, true)]
    #[case::after(1_000_001, true)]
    #[case::long_after(5_000_000, true)]
    fn boundary_is_inclusive(#[case] now_millis: i64, #[case] expired: bool) {
        let token = make_jwt_with_exp(1000);
        assert_eq!(policy_at(now_millis).is_expired(Some(&token)), expired);
    }

    #[rstest]
    #[case::none(None)]
    #[case::empty(Some(""))]
    #[case::garbage(Some("garbage"))]
    #[case::bad_payload(Some("a.!!!.c"))]
    fn missing_or_malformed_is_expired(#[case] token: Option<&str>) {
        assert!(policy_at(0).is_expired(token));
    }

    #[test]
    fn missing_exp_is_expired() {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let token = format!("h.{}.s", engine.encode(r#"{"sub":"u"}"#));
        assert!(policy_at(0).is_expired(Some(&token)));
    }

    #[test]
    fn leeway_pulls_expiry_forward() {
        let token = make_jwt_with_exp(1000);
        let policy = policy_at(950_000);
        assert!(!policy.is_expired(Some(&token)));
        assert!(!policy.expires_within(Some(&token), 49));
        assert!(policy.expires_within(Some(&token), 50));
    }

    #[test]
    fn huge_leeway_does_not_overflow() {
        let token = make_jwt_with_exp(i64::MAX);
        assert!(policy_at(0).expires_within(Some(&token), u64::MAX));
    }
}
