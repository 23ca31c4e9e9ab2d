use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Claims read from an access token without signature verification.
///
/// Advisory only: the issuing server is the trust boundary, so nothing here is
/// proof of authenticity for privileged actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedClaims {
    /// `sub` claim. Empty when the token carries none.
    pub subject: String,
    /// `exp` claim in epoch seconds. `None` means the token is treated as expired.
    pub expires_at_epoch_secs: Option<i64>,
    /// `org_id` (or `organizationId`) claim, forwarded on refresh.
    pub organization_id: Option<String>,
}

/// Lightweight identity derived from decoded claims, for display and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionIdentity {
    pub subject: String,
    pub organization_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DecodedClaims {
    #[must_use]
    pub fn to_identity(&self) -> SessionIdentity {
        SessionIdentity {
            subject: self.subject.clone(),
            organization_id: self.organization_id.clone(),
            expires_at: self
                .expires_at_epoch_secs
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

/// Decode the payload segment of a JWT.
///
/// Returns `None` for anything that is not a three-segment token with a
/// base64url JSON object payload. Never panics.
#[must_use]
pub fn decode(token: &str) -> Option<DecodedClaims> {
    match decode_payload(token) {
        Ok(payload) => Some(claims_from_payload(&payload)),
        Err(reason) => {
            tracing::debug!(reason, "access token not decodable");
            None
        }
    }
}

fn decode_payload(token: &str) -> Result<serde_json::Map<String, Value>, &'static str> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err("invalid JWT format");
    }
    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|_| "base64 decode failed")?;
    match serde_json::from_slice::<Value>(&payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("payload is not a JSON object"),
        Err(_) => Err("JSON parse failed"),
    }
}

fn claims_from_payload(payload: &serde_json::Map<String, Value>) -> DecodedClaims {
    let string_claim = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };

    DecodedClaims {
        subject: string_claim("sub").unwrap_or_default(),
        expires_at_epoch_secs: payload.get("exp").and_then(epoch_secs),
        organization_id: string_claim("org_id").or_else(|| string_claim("organizationId")),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn epoch_secs(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.floor() as i64)
    })
}
