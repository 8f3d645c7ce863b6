//! Transform and load legacy product tables
//!
//! [`SyncRun`] drives the whole thing: fetch rows through a
//! [`crate::api::LegacyClient`], transform them with a [`RecordTransformer`],
//! resolve late parents with a [`PendingRelationshipResolver`] and hand the
//! results to a [`Loader`].

pub mod loader;
pub mod lookup;
pub mod pipeline;
pub mod resolver;
pub mod transform;
pub mod types;

pub use loader::{Loader, MemoryLoader};
pub use lookup::{LinkOutcome, LookupChain, LookupOutcome, ParentIndex, ParentLookup, link_parent};
pub use pipeline::{SkippedRecord, SyncOptions, SyncReport, SyncRun};
pub use resolver::PendingRelationshipResolver;
pub use transform::{FieldMap, RecordTransformer, TransformError, TransformOutcome};
pub use types::*;
