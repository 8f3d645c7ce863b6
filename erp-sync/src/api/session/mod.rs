//! Session handling: cookie jar, persistence and lifecycle

pub mod cookies;
pub mod manager;
pub mod models;
pub mod store;

pub use cookies::{Cookie, CookieJar};
pub use manager::SessionManager;
pub use models::{Credentials, Session, SessionState};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
