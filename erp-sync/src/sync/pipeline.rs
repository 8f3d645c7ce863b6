//! One "sync table X" run, end to end
//!
//! Rows are streamed from the gateway, transformed, and loaded as soon as
//! they are resolved. Parents feed a per-run [`ParentIndex`]; variants that
//! arrive before their parent are retried once the whole table has been read.

use std::time::{Duration, Instant};

use anyhow::Context;
use futures::TryStreamExt;
use serde::Serialize;

use crate::api::{FetchOptions, LegacyClient, RawRecord};

use super::loader::Loader;
use super::lookup::{LookupChain, ParentIndex, ParentLookup};
use super::resolver::PendingRelationshipResolver;
use super::transform::{RecordTransformer, TransformOutcome};
use super::types::{TransformedRecord, UnresolvedRelationship};

/// Knobs for a [`SyncRun`]
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub fetch: FetchOptions,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// A row that was dropped, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Position in the fetched stream, from 0; `None` for deferred variants
    pub position: Option<usize>,
    /// Best available identity (legacy id or sku), if any
    pub identity: Option<String>,
    pub reason: String,
}

/// Outcome of a sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub table: String,
    pub fetched: usize,
    pub resolved_parents: usize,
    pub resolved_variants: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: Vec<SkippedRecord>,
    pub rejected: Vec<SkippedRecord>,
    pub unresolved: Vec<UnresolvedRelationship>,
}

impl SyncReport {
    /// Nothing skipped, rejected or left unresolved
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.rejected.is_empty() && self.unresolved.is_empty()
    }

    pub fn loaded(&self) -> usize {
        self.created + self.updated
    }
}

pub struct SyncRun<'a, L> {
    client: &'a LegacyClient,
    transformer: &'a RecordTransformer,
    loader: &'a L,
    options: SyncOptions,
}

impl<'a, L> SyncRun<'a, L>
where
    L: Loader + ParentLookup,
{
    pub fn new(client: &'a LegacyClient, transformer: &'a RecordTransformer, loader: &'a L) -> Self {
        Self {
            client,
            transformer,
            loader,
            options: SyncOptions {
                fetch: client.fetch_options(),
                ..SyncOptions::default()
            },
        }
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Sync one table
    ///
    /// A failed page request aborts the run. Everything else ends up in the
    /// report.
    pub async fn run(&self, table: &str) -> anyhow::Result<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport {
            table: table.to_string(),
            ..SyncReport::default()
        };
        let mut index = ParentIndex::new();
        let mut resolver = PendingRelationshipResolver::new();

        log::info!("Syncing {} from {}", table, self.client.base_url());

        let mut rows = std::pin::pin!(self.client.fetch_stream(table, self.options.fetch.clone()));
        while let Some(raw) = rows
            .try_next()
            .await
            .with_context(|| format!("Failed to fetch {}", table))?
        {
            let position = report.fetched;
            report.fetched += 1;

            match self.transformer.transform(&raw, &index, &mut resolver) {
                TransformOutcome::Resolved(record) => {
                    if record.is_parent() {
                        index.insert(&record);
                        report.resolved_parents += 1;
                    } else {
                        report.resolved_variants += 1;
                    }
                    self.load(&record, Some(position), &mut report).await;
                }
                TransformOutcome::Deferred => {}
                TransformOutcome::Skipped(err) => report.skipped.push(SkippedRecord {
                    position: Some(position),
                    identity: self.identity(&raw),
                    reason: err.to_string(),
                }),
                TransformOutcome::Rejected(err) => report.rejected.push(SkippedRecord {
                    position: Some(position),
                    identity: self.identity(&raw),
                    reason: err.to_string(),
                }),
            }
        }

        if !resolver.is_empty() {
            log::info!("Resolving {} deferred variants", resolver.len());
            let lookup = LookupChain::new().then(&index).then(self.loader);
            let resolution = resolver
                .resolve_all(&lookup, self.options.max_attempts, self.options.backoff)
                .await;

            for resolved in resolution.resolved {
                report.resolved_variants += 1;
                self.load(&resolved.record, None, &mut report).await;
            }
            report.unresolved = resolution.unresolved;
        }

        log::info!(
            "Synced {}: {} fetched, {} created, {} updated, {} skipped, {} rejected, {} unresolved in {}ms",
            table,
            report.fetched,
            report.created,
            report.updated,
            report.skipped.len(),
            report.rejected.len(),
            report.unresolved.len(),
            started.elapsed().as_millis()
        );
        Ok(report)
    }

    async fn load(
        &self,
        record: &TransformedRecord,
        position: Option<usize>,
        report: &mut SyncReport,
    ) {
        match self.loader.upsert(&record.lookup_keys(), &record.to_fields()).await {
            Ok((_, true)) => report.created += 1,
            Ok((_, false)) => report.updated += 1,
            Err(err) => {
                log::warn!("Failed to load {}: {:#}", record.label(), err);
                report.skipped.push(SkippedRecord {
                    position,
                    identity: Some(record.label()),
                    reason: format!("load failed: {:#}", err),
                });
            }
        }
    }

    fn identity(&self, raw: &RawRecord) -> Option<String> {
        let map = self.transformer.field_map();
        raw.text(&map.legacy_id).or_else(|| raw.text(&map.sku))
    }
}
