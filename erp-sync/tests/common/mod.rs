//! Stub 4D gateway for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const USERNAME: &str = "sync";
pub const PASSWORD: &str = "secret";

/// Behaviour and request log of the stub
#[derive(Default)]
pub struct Gateway {
    /// Rows served for every table
    pub records: Mutex<Vec<Value>>,
    /// `GET`/`POST` lines in arrival order, path and raw query included
    pub requests: Mutex<Vec<String>>,
    /// Session id accepted by the gateway
    pub session_id: Mutex<String>,
    /// Cookie the session id travels in
    pub cookie_name: Mutex<String>,
    /// Session id handed out on the next probe, then made current
    pub rotate_on_probe: Mutex<Option<String>>,
    /// Status forced on table requests
    pub table_status: Mutex<Option<StatusCode>>,
    pub logins: AtomicUsize,
}

impl Gateway {
    pub fn new(records: Vec<Value>) -> Arc<Self> {
        let gateway = Self::default();
        *gateway.records.lock().unwrap() = records;
        *gateway.session_id.lock().unwrap() = "session-1".to_string();
        *gateway.cookie_name.lock().unwrap() = "WASID4D".to_string();
        Arc::new(gateway)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Table requests only
    pub fn table_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| !r.contains("$directory") && !r.contains("$catalog"))
            .collect()
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    fn session_cookie(&self, id: &str) -> HeaderValue {
        let name = self.cookie_name.lock().unwrap().clone();
        HeaderValue::from_str(&format!("{}={}; Path=/; HttpOnly", name, id)).unwrap()
    }

    fn log(&self, line: String) {
        self.requests.lock().unwrap().push(line);
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!(
            "{}={}",
            self.cookie_name.lock().unwrap(),
            self.session_id.lock().unwrap()
        );
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|cookies| cookies.split("; ").any(|c| c == expected))
            .unwrap_or(false)
    }
}

/// Serve the stub on an ephemeral port; returns the base URL
pub async fn spawn(gateway: Arc<Gateway>) -> String {
    let app = Router::new()
        .route("/rest/$directory/login", post(login))
        .route("/rest/$directory/logout", get(logout))
        .route("/rest/$catalog", get(catalog))
        .route("/rest/{table}", get(table))
        .with_state(gateway);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/rest", addr)
}

async fn login(State(gateway): State<Arc<Gateway>>, headers: HeaderMap) -> Response {
    gateway.log("POST $directory/login".to_string());
    gateway.logins.fetch_add(1, Ordering::SeqCst);

    let user = headers.get("username-4D").and_then(|v| v.to_str().ok());
    let pass = headers.get("password-4D").and_then(|v| v.to_str().ok());
    if user != Some(USERNAME) || pass != Some(PASSWORD) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let id = gateway.session_id.lock().unwrap().clone();
    let mut response = Json(json!({"result": true})).into_response();
    response.headers_mut().append(header::SET_COOKIE, gateway.session_cookie(&id));
    response
}

async fn logout(State(gateway): State<Arc<Gateway>>) -> StatusCode {
    gateway.log("GET $directory/logout".to_string());
    StatusCode::OK
}

async fn catalog(State(gateway): State<Arc<Gateway>>, headers: HeaderMap) -> Response {
    gateway.log("GET $catalog".to_string());
    if !gateway.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut response = Json(json!({"dataClasses": []})).into_response();
    if let Some(next) = gateway.rotate_on_probe.lock().unwrap().take() {
        *gateway.session_id.lock().unwrap() = next.clone();
        let headers = response.headers_mut();
        headers.append(header::SET_COOKIE, gateway.session_cookie(&next));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("lang=en; Path=/"));
    }
    response
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}

async fn table(
    State(gateway): State<Arc<Gateway>>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let query = query.unwrap_or_default();
    gateway.log(format!("GET {}?{}", table, query));

    if let Some(status) = *gateway.table_status.lock().unwrap() {
        return (status, "gateway failure ".repeat(100)).into_response();
    }
    if !gateway.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let skip: usize = query_param(&query, "$skip").and_then(|s| s.parse().ok()).unwrap_or(0);
    let top: usize = query_param(&query, "$top").and_then(|s| s.parse().ok()).unwrap_or(100);

    let records = gateway.records.lock().unwrap();
    let page: Vec<Value> = records.iter().skip(skip).take(top).cloned().collect();
    if page.is_empty() {
        return Json(json!({"__COUNT": 0})).into_response();
    }
    Json(json!({"__COUNT": page.len(), "__ENTITIES": page})).into_response()
}
