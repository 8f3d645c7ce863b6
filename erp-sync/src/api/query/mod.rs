//! Query construction for the legacy table endpoints
//!
//! Follows the same split as the rest of the client: plain data types
//! (`Filter`, `FilterExpression`, `FetchRequest`) and a separate encoder
//! that knows the wire dialect.

pub mod encoder;
pub mod filters;
pub mod request;

pub use encoder::FilterEncoder;
pub use filters::{Filter, FilterExpression, FilterTerm, FilterValue, Operator};
pub use request::{FetchOptions, FetchRequest};
