//! Client for the legacy 4D REST gateway
//!
//! Session handling, `$filter` construction and paginated table fetches.
//! Everything here speaks the gateway's wire format; mapping rows onto
//! product records happens in `crate::sync`.

pub mod client;
pub mod constants;
pub mod dates;
pub mod error;
pub mod models;
pub mod query;
pub mod session;

pub use client::{ClientOptions, LegacyClient};
pub use dates::{LegacyDate, normalize_dates, parse_legacy_date};
pub use error::ApiError;
pub use models::RawRecord;
pub use query::{FetchOptions, FetchRequest, Filter, FilterEncoder, FilterExpression, FilterValue, Operator};
pub use session::{
    Credentials, FileSessionStore, MemorySessionStore, Session, SessionManager, SessionState,
    SessionStore,
};
