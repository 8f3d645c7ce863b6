//! Session lifecycle against the 4D gateway
//!
//! The manager owns the cookie jar for one base URL. It reuses a stored
//! session when the probe endpoint still accepts it, logs in otherwise, and
//! adopts any new session token the server hands out on later responses.

use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::header::{COOKIE, HeaderMap};
use reqwest::{RequestBuilder, StatusCode};

use super::cookies::{CookieJar, find_session_cookie, parse_set_cookies};
use super::models::{Credentials, Session, SessionState, normalize_base_url};
use super::store::SessionStore;
use crate::api::constants::{
    LOGIN_PATH, LOGOUT_PATH, PROBE_PATH, SESSION_LENGTH_SECS, headers,
};
use crate::api::error::ApiError;

#[derive(Debug)]
struct Inner {
    state: SessionState,
    cookies: CookieJar,
    session: Option<Session>,
}

/// Manages the authenticated session for one base URL
pub struct SessionManager {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    store: Arc<dyn SessionStore>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.base_url)
            .field("state", &self.state())
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        credentials: Option<Credentials>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            credentials,
            store,
            inner: Mutex::new(Inner {
                state: SessionState::NoSession,
                cookies: CookieJar::new(),
                session: None,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> SessionState {
        self.inner().state
    }

    /// The session currently in use, if one has been established
    pub fn session(&self) -> Option<Session> {
        self.inner().session.clone()
    }

    /// Snapshot of the cookie jar
    pub fn cookies(&self) -> CookieJar {
        self.inner().cookies.clone()
    }

    fn set_state(&self, state: SessionState) {
        let mut inner = self.inner();
        if inner.state != state {
            log::debug!("Session for {}: {:?} -> {:?}", self.base_url, inner.state, state);
            inner.state = state;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Attach the current cookies to a request
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.inner().cookies.header_value() {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    /// Inspect response cookies and rotate to a new session token if one
    /// was issued
    ///
    /// A new token replaces the whole cookie set and is persisted.
    pub async fn observe_response(&self, response_headers: &HeaderMap) {
        let received = parse_set_cookies(response_headers);
        if received.is_empty() {
            return;
        }

        let rotated = {
            let mut inner = self.inner();
            match find_session_cookie(&received) {
                Some(fresh)
                    if inner.cookies.session_cookie().map(|c| c.value.as_str())
                        != Some(fresh.value.as_str()) =>
                {
                    inner.cookies.replace_all(fresh.name.clone(), fresh.value.clone());
                    let session = Session::new(&self.base_url, fresh.value.clone())
                        .with_cookie_name(fresh.name.clone());
                    inner.session = Some(session.clone());
                    Some(session)
                }
                Some(_) => None,
                None => {
                    for cookie in &received {
                        inner.cookies.set(cookie.name.clone(), cookie.value.clone());
                    }
                    None
                }
            }
        };

        if let Some(session) = rotated {
            log::info!("Adopted new session token for {}", self.base_url);
            if !self.store.save(&session).await {
                log::warn!("Could not persist rotated session for {}", self.base_url);
            }
        }
    }

    /// Probe the gateway with the current cookies
    ///
    /// Transport failures are errors; a rejected probe is `Ok(false)`.
    pub async fn validate_session(&self) -> Result<bool, ApiError> {
        let request = self.authorize(self.http.get(self.url(PROBE_PATH)));
        let response = request.send().await?;
        self.observe_response(response.headers()).await;

        let status = response.status();
        if status.is_success() {
            self.set_state(SessionState::Valid);
            Ok(true)
        } else {
            log::debug!("Session probe for {} returned {}", self.base_url, status);
            self.set_state(SessionState::Invalid);
            Ok(false)
        }
    }

    /// Authenticate with the configured credentials
    ///
    /// Returns `Ok(false)` when the gateway rejects the credentials. A login
    /// that succeeds without issuing a recognizable session cookie still
    /// counts as success as long as the probe accepts it.
    pub async fn login(&self) -> Result<bool, ApiError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ApiError::Session(format!("no credentials configured for {}", self.base_url))
        })?;

        {
            let mut inner = self.inner();
            inner.cookies.clear();
            inner.session = None;
        }

        log::debug!("Logging in to {} as {}", self.base_url, credentials.username);
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .header(headers::USERNAME, &credentials.username)
            .header(headers::PASSWORD, &credentials.password)
            .header(headers::SESSION_LENGTH, SESSION_LENGTH_SECS.to_string())
            .send()
            .await?;

        self.observe_response(response.headers()).await;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            log::warn!("Login to {} rejected ({})", self.base_url, status);
            self.set_state(SessionState::Invalid);
            return Ok(false);
        }
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            self.set_state(SessionState::Invalid);
            return Err(ApiError::response(status.as_u16(), &body));
        }
        if login_refused(&body) {
            log::warn!("Login to {} refused by the gateway", self.base_url);
            self.set_state(SessionState::Invalid);
            return Ok(false);
        }

        if !self.validate_session().await? {
            return Err(ApiError::Session(format!(
                "login to {} succeeded but the session probe was rejected",
                self.base_url
            )));
        }

        match self.session() {
            Some(_) => log::info!("Logged in to {}", self.base_url),
            None => log::info!(
                "Logged in to {} without a session token, continuing cookieless",
                self.base_url
            ),
        }
        Ok(true)
    }

    /// Make sure a usable session exists, loading or logging in as needed
    ///
    /// Safe to call before every fetch. A session another client saved to
    /// the shared store is adopted before credentials are posted.
    pub async fn ensure_session(&self) -> Result<bool, ApiError> {
        match self.state() {
            SessionState::Valid => {
                if self.validate_session().await? {
                    return Ok(true);
                }
                log::info!("Session for {} expired", self.base_url);
            }
            SessionState::NoSession | SessionState::Loading => {
                self.set_state(SessionState::Loading);
            }
            SessionState::Invalid => {}
        }

        let stale = self.session().map(|s| s.session_id);
        if self.adopt_stored(stale.as_deref()).await? {
            return Ok(true);
        }
        self.set_state(SessionState::Invalid);
        self.login().await
    }

    /// Adopt the persisted session for this base URL if the probe accepts it
    pub async fn restore_session(&self) -> Result<bool, ApiError> {
        self.adopt_stored(None).await
    }

    /// Load the stored session unless it is the one that just failed
    async fn adopt_stored(&self, stale: Option<&str>) -> Result<bool, ApiError> {
        let Some(stored) = self.store.load(&self.base_url).await else {
            log::debug!("No stored session for {}", self.base_url);
            return Ok(false);
        };
        if stale == Some(stored.session_id.as_str()) {
            log::debug!("Stored session for {} is the expired one", self.base_url);
            return Ok(false);
        }

        {
            let mut inner = self.inner();
            inner.cookies.clear();
            inner.cookies.set(stored.cookie_name.clone(), stored.session_id.clone());
            inner.session = Some(stored);
        }

        if self.validate_session().await? {
            log::debug!("Reusing stored session for {}", self.base_url);
            return Ok(true);
        }

        let mut inner = self.inner();
        inner.cookies.clear();
        inner.session = None;
        Ok(false)
    }

    /// Mark the session unusable so the next `ensure_session` re-authenticates
    pub fn invalidate(&self) {
        self.set_state(SessionState::Invalid);
    }

    /// End the session on the server and forget it locally
    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = self.authorize(self.http.get(self.url(LOGOUT_PATH)));
        let result = request.send().await;

        {
            let mut inner = self.inner();
            inner.cookies.clear();
            inner.session = None;
            inner.state = SessionState::NoSession;
        }
        self.store.remove(&self.base_url).await;

        let response = result?;
        if !response.status().is_success() {
            log::warn!(
                "Logout from {} returned {}",
                self.base_url,
                response.status()
            );
        }
        Ok(())
    }
}

/// `{"result": false}` bodies signal refused credentials with a 200 status
fn login_refused(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("result").and_then(|r| r.as_bool()))
        == Some(false)
}
