//! Minimal cookie model: `Set-Cookie` serialization and `Cookie` header parsing.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use keyfresh_config::{CookieConfig, SameSite};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Seconds; `Some(0)` instructs the browser to drop the cookie.
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    pub same_site: Option<SameSite>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            expires: None,
            same_site: None,
            secure: false,
            http_only: false,
        }
    }

    /// A cookie carrying the path/domain/same-site/secure attributes from config.
    #[must_use]
    pub fn with_config(
        name: impl Into<String>,
        value: impl Into<String>,
        config: &CookieConfig,
    ) -> Self {
        Self {
            path: Some(config.path.clone()),
            domain: config.domain.clone(),
            same_site: Some(config.same_site),
            secure: config.secure,
            ..Self::new(name, value)
        }
    }

    /// A removal cookie: empty value, `Max-Age=0`.
    #[must_use]
    pub fn removal(name: impl Into<String>, config: &CookieConfig) -> Self {
        Self {
            max_age: Some(0),
            ..Self::with_config(name, "", config)
        }
    }

    #[must_use]
    pub const fn is_removal(&self) -> bool {
        matches!(self.max_age, Some(age) if age <= 0)
    }
}

/// Renders the `Set-Cookie` header value.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT"))?;
        }
        if let Some(same_site) = self.same_site {
            let value = match same_site {
                SameSite::Strict => "Strict",
                SameSite::Lax => "Lax",
                SameSite::None => "None",
            };
            write!(f, "; SameSite={value}")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

/// Parse a `Cookie` request header into name/value pairs.
///
/// Segments without `=` are skipped; surrounding double quotes on a value are
/// removed. The first occurrence of a name wins.
#[must_use]
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for segment in header.split(';') {
        let Some((name, value)) = segment.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        cookies
            .entry(name.to_owned())
            .or_insert_with(|| value.to_owned());
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_cookie_renders_all_attributes() {
        let mut cookie = Cookie::with_config("refresh_token", "rt-abc", &CookieConfig::default());
        cookie.expires = DateTime::from_timestamp(0, 0);
        cookie.secure = true;
        assert_eq!(
            cookie.to_string(),
            "refresh_token=rt-abc; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn removal_cookie_has_zero_max_age() {
        let cookie = Cookie::removal("access_token", &CookieConfig::default());
        assert!(cookie.is_removal());
        assert_eq!(cookie.to_string(), "access_token=; Path=/; Max-Age=0; SameSite=Lax");
    }

    #[test]
    fn bare_cookie_renders_name_value_only() {
        assert_eq!(Cookie::new("a", "b").to_string(), "a=b");
    }

    #[test]
    fn parses_cookie_header_with_noise() {
        let cookies = parse_cookie_header(
            " access_token=at-1 ; theme=dark;flag; refresh_token=\"rt-1\"; =orphan; access_token=dup",
        );
        assert_eq!(cookies.get("access_token").map(String::as_str), Some("at-1"));
        assert_eq!(cookies.get("refresh_token").map(String::as_str), Some("rt-1"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
        assert!(!cookies.contains_key("flag"));
        assert_eq!(cookies.len(), 3);
    }

    #[test]
    fn empty_header_yields_nothing() {
        assert!(parse_cookie_header("").is_empty());
    }
}
