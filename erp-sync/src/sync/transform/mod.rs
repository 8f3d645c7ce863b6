//! Legacy row to canonical record transformation

pub mod boolean;
pub mod engine;
pub mod mapping;
pub mod price;
pub mod sku;

pub use boolean::{normalize_bool, parse_bool};
pub use engine::{RecordTransformer, TransformError, TransformOutcome};
pub use mapping::FieldMap;
pub use price::{Prices, parse_price, parse_prices};
pub use sku::decompose_sku;
