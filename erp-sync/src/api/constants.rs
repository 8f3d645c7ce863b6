//! Wire-level constants for the 4D REST gateway

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "WASID4D";

/// Prefix of the alternate session cookie (`4DSID_<application>`)
pub const FALLBACK_SESSION_COOKIE_PREFIX: &str = "4DSID";

/// Login endpoint, relative to the base URL
pub const LOGIN_PATH: &str = "$directory/login";

/// Logout endpoint, relative to the base URL
pub const LOGOUT_PATH: &str = "$directory/logout";

/// Lightweight endpoint used to check that a session is still accepted
pub const PROBE_PATH: &str = "$catalog";

/// Login request headers understood by the gateway
pub mod headers {
    pub const USERNAME: &str = "username-4D";
    pub const PASSWORD: &str = "password-4D";
    pub const SESSION_LENGTH: &str = "session-4D-length";
}

/// Requested session lifetime in seconds
pub const SESSION_LENGTH_SECS: u64 = 3600;

/// Key holding the record array in an entity-set response
pub const ENTITIES_KEY: &str = "__ENTITIES";

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fields carrying legacy `D!M!YYYY` dates unless configured otherwise
pub const DEFAULT_DATE_FIELDS: &[&str] = &[
    "CreatedOn",
    "ModifiedOn",
    "ValidFrom",
    "ValidUntil",
    "ReleaseDate",
    "DiscontinuedOn",
];
