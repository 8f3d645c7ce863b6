//! Core types for the sync pipeline

mod pending;
mod record;

pub use pending::*;
pub use record::*;
