//! Session and credential models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::constants::SESSION_COOKIE;

/// An authenticated session for one API base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub base_url: String,
    pub session_id: String,
    #[serde(rename = "timestamp")]
    pub acquired_at: DateTime<Utc>,
    /// Cookie the gateway issued the session under
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_cookie_name() -> String {
    SESSION_COOKIE.to_string()
}

impl Session {
    pub fn new(base_url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            session_id: session_id.into(),
            acquired_at: Utc::now(),
            cookie_name: default_cookie_name(),
        }
    }

    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }
}

/// Login credentials for one environment
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Lifecycle state of a [`super::SessionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Loading,
    Valid,
    Invalid,
}

/// Canonical form used as the session key
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}
