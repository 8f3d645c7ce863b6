//! Minimal cookie jar for the session cookie
//!
//! The gateway only ever needs the session cookie and a handful of
//! auxiliary ones, so cookies are tracked by name in insertion order and
//! sent back verbatim in a single `Cookie` header.

use reqwest::header::{HeaderMap, SET_COOKIE};

use crate::api::constants::{FALLBACK_SESSION_COOKIE_PREFIX, SESSION_COOKIE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie, replacing any cookie with the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.cookies.retain(|c| c.name != name);
        self.cookies.push(Cookie {
            name,
            value: value.into(),
        });
    }

    /// Drop every cookie and keep only the given one
    pub fn replace_all(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.clear();
        self.set(name, value);
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Number of cookies with the given name
    pub fn count(&self, name: &str) -> usize {
        self.cookies.iter().filter(|c| c.name == name).count()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Current session cookie, preferring `WASID4D` over the fallback name
    pub fn session_cookie(&self) -> Option<&Cookie> {
        self.cookies
            .iter()
            .find(|c| c.name == SESSION_COOKIE)
            .or_else(|| {
                self.cookies
                    .iter()
                    .find(|c| c.name.starts_with(FALLBACK_SESSION_COOKIE_PREFIX))
            })
    }

    /// Value for the `Cookie` request header
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Parse every `Set-Cookie` header into name/value pairs
///
/// Attributes (path, expiry, flags) are ignored.
pub fn parse_set_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| {
            let pair = value.split(';').next()?.trim();
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Cookie {
                name: name.to_string(),
                value: value.trim().trim_matches('"').to_string(),
            })
        })
        .collect()
}

/// Session cookie among freshly received cookies
pub fn find_session_cookie(cookies: &[Cookie]) -> Option<&Cookie> {
    cookies
        .iter()
        .find(|c| c.name == SESSION_COOKIE)
        .or_else(|| {
            cookies
                .iter()
                .find(|c| c.name.starts_with(FALLBACK_SESSION_COOKIE_PREFIX))
        })
}
