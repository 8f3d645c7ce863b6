//! HTTP client for the legacy table endpoints
//!
//! `LegacyClient` pages through a table with `$skip`/`$top`, keeping the
//! session alive through its [`SessionManager`]. Pages are exposed as a lazy
//! stream; `fetch` collects everything into memory.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt, TryStreamExt, stream};
use reqwest::StatusCode;
use serde_json::Value;

use super::constants::{DEFAULT_DATE_FIELDS, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS, ENTITIES_KEY};
use super::dates::normalize_dates;
use super::error::ApiError;
use super::models::RawRecord;
use super::query::{FetchOptions, FetchRequest, FilterEncoder};
use super::session::{Credentials, SessionManager, SessionStore};

/// Tunables for a [`LegacyClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Page size used when callers do not pick one
    pub page_size: usize,
    pub fail_on_filter_error: bool,
    /// Fields holding legacy `D!M!YYYY` dates
    pub date_fields: Vec<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            fail_on_filter_error: true,
            date_fields: DEFAULT_DATE_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

enum PageCursor {
    Start { table: String, options: FetchOptions },
    Next { request: FetchRequest, all_records: bool },
    Done,
}

/// Session-authenticated client for one legacy gateway
#[derive(Debug, Clone)]
pub struct LegacyClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
    encoder: FilterEncoder,
    options: ClientOptions,
}

impl LegacyClient {
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        store: Arc<dyn SessionStore>,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        reqwest::Url::parse(base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL '{}': {}", base_url, e)))?;
        if options.page_size == 0 {
            return Err(ApiError::Configuration("page size must be at least 1".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        let session = Arc::new(SessionManager::new(http.clone(), base_url, credentials, store));

        Ok(Self {
            http,
            base_url: session.base_url().to_string(),
            session,
            encoder: FilterEncoder::new(options.fail_on_filter_error),
            options,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Fetch options pre-filled with this client's default page size
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::default().page_size(self.options.page_size)
    }

    /// Fetch a table into memory
    ///
    /// Any failed page aborts the whole fetch.
    pub async fn fetch(&self, table: &str, options: FetchOptions) -> Result<Vec<RawRecord>, ApiError> {
        let started = Instant::now();
        let records: Vec<RawRecord> = self.fetch_pages(table, options).try_concat().await?;
        log::info!(
            "Fetched {} records from {} in {}ms",
            records.len(),
            table,
            started.elapsed().as_millis()
        );
        Ok(records)
    }

    /// Stream of individual records, in server order
    pub fn fetch_stream<'a>(
        &'a self,
        table: &str,
        options: FetchOptions,
    ) -> impl Stream<Item = Result<RawRecord, ApiError>> + 'a {
        self.fetch_pages(table, options)
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<RawRecord, ApiError>)))
            .try_flatten()
    }

    /// Stream of pages
    ///
    /// Paging stops after the first page when `all_records` is false, or at
    /// the first short or empty page. An error ends the stream.
    pub fn fetch_pages<'a>(
        &'a self,
        table: &str,
        options: FetchOptions,
    ) -> impl Stream<Item = Result<Vec<RawRecord>, ApiError>> + 'a {
        let start = PageCursor::Start {
            table: table.to_string(),
            options,
        };

        stream::try_unfold(start, move |cursor| async move {
            let (request, all_records) = match cursor {
                PageCursor::Done => return Ok(None),
                PageCursor::Start { table, options } => {
                    let request = self.first_request(&table, &options).await?;
                    (request, options.all_records)
                }
                PageCursor::Next {
                    request,
                    all_records,
                } => (request, all_records),
            };

            let page = self.fetch_page(&request).await?;
            let received = page.len();

            let next = if !all_records || received == 0 || received < request.page_size {
                PageCursor::Done
            } else {
                PageCursor::Next {
                    request: request.next(received),
                    all_records,
                }
            };
            Ok(Some((page, next)))
        })
        .boxed()
    }

    async fn first_request(&self, table: &str, options: &FetchOptions) -> Result<FetchRequest, ApiError> {
        if table.trim().is_empty() {
            return Err(ApiError::Configuration("table name must not be empty".to_string()));
        }
        if options.page_size == 0 {
            return Err(ApiError::Configuration("page size must be at least 1".to_string()));
        }

        let encoded_filter = match &options.filter {
            Some(filter) => self.encoder.encode(filter)?,
            None => None,
        };

        if !self.session.ensure_session().await? {
            return Err(ApiError::Session(format!(
                "credentials rejected by {}",
                self.base_url
            )));
        }

        Ok(FetchRequest {
            table: table.trim().to_string(),
            skip: options.skip,
            page_size: options.page_size,
            encoded_filter,
        })
    }

    async fn fetch_page(&self, request: &FetchRequest) -> Result<Vec<RawRecord>, ApiError> {
        let url = request.to_url(&self.base_url);
        let started = Instant::now();

        let response = self.session.authorize(self.http.get(&url)).send().await?;
        self.session.observe_response(response.headers()).await;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                self.session.invalidate();
            }
            if status == StatusCode::SERVICE_UNAVAILABLE {
                return Err(ApiError::ServerUnavailable(format!(
                    "{} answered 503 for {}",
                    self.base_url, request.table
                )));
            }
            return Err(ApiError::response(status.as_u16(), &body));
        }

        let mut records = parse_entities(&body)?;
        for record in &mut records {
            normalize_dates(record, &self.options.date_fields);
        }

        log::debug!(
            "Page {} skip={} top={}: {} records in {}ms",
            request.table,
            request.skip,
            request.page_size,
            records.len(),
            started.elapsed().as_millis()
        );
        Ok(records)
    }
}

/// Extract records from an entity-set body or a bare array
pub fn parse_entities(body: &str) -> Result<Vec<RawRecord>, ApiError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::Data(format!("response is not valid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(ENTITIES_KEY) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ApiError::Data(format!(
                    "{} is not an array: {}",
                    ENTITIES_KEY, other
                )));
            }
            // 4D omits the entity list when the selection is empty
            None if map.get("__COUNT").and_then(|c| c.as_u64()) == Some(0) => Vec::new(),
            None => {
                return Err(ApiError::Data(format!(
                    "response has no {} member",
                    ENTITIES_KEY
                )));
            }
        },
        other => {
            return Err(ApiError::Data(format!(
                "unexpected response shape: {}",
                other
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            RawRecord::from_value(item)
                .ok_or_else(|| ApiError::Data(format!("entity {} is not an object", i)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::session::MemorySessionStore;

    #[test]
    fn test_parse_entity_set() {
        let body = r#"{"__entityModel":"Products","__COUNT":2,"__ENTITIES":[{"ID":1},{"ID":2}]}"#;
        let records = parse_entities(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text("ID"), Some("2".to_string()));
    }

    #[test]
    fn test_parse_bare_array() {
        assert_eq!(parse_entities(r#"[{"ID":1}]"#).unwrap().len(), 1);
        assert!(parse_entities("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_empty_selection() {
        assert!(parse_entities(r#"{"__COUNT":0}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_entities("<html>"), Err(ApiError::Data(_))));
        assert!(matches!(parse_entities(r#"{"foo":1}"#), Err(ApiError::Data(_))));
        assert!(matches!(parse_entities(r#"[1, 2]"#), Err(ApiError::Data(_))));
        assert!(matches!(parse_entities(r#"{"__ENTITIES":{}}"#), Err(ApiError::Data(_))));
        assert!(matches!(parse_entities("42"), Err(ApiError::Data(_))));
    }

    #[test]
    fn test_new_rejects_bad_configuration() {
        let store = Arc::new(MemorySessionStore::new());
        let err = LegacyClient::new("not a url", None, store.clone(), ClientOptions::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));

        let options = ClientOptions {
            page_size: 0,
            ..ClientOptions::default()
        };
        let err = LegacyClient::new("http://localhost/rest", None, store, options).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn test_fetch_options_use_client_page_size() {
        let options = ClientOptions {
            page_size: 250,
            ..ClientOptions::default()
        };
        let client = LegacyClient::new(
            "http://localhost/rest/",
            None,
            Arc::new(MemorySessionStore::new()),
            options,
        )
        .unwrap();
        assert_eq!(client.fetch_options().page_size, 250);
        assert_eq!(client.base_url(), "http://localhost/rest");
    }
}
