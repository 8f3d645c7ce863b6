//! Synchronization of product data from a legacy 4D ERP
//!
//! - [`api`]: session-authenticated, paginated access to the 4D REST gateway
//! - [`sync`]: record transformation, deferred parent resolution and loading
//! - [`config`]: TOML configuration and environment selection
//! - [`cli`]: the `erp-sync` command line

pub mod api;
pub mod cli;
pub mod config;
pub mod sync;
