//! Parent lookups for variant records
//!
//! A variant is linked in two tiers: first by the parent's legacy id, then by
//! its own base sku against the sku of known parents. [`ParentIndex`] is the
//! per-run, in-memory side of that; anything implementing [`ParentLookup`]
//! (a loader, a remote catalog) can stand in or be chained behind it.

use std::collections::HashMap;

use async_trait::async_trait;

use super::types::{LookupFailure, LookupStrategy, ParentRef, TransformedRecord};

/// Result of a single lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Exactly one parent matches
    Found(ParentRef),
    /// No parent matches
    NotFound,
    /// Several parents match this key
    Ambiguous(usize),
}

/// Source of parent products
#[async_trait]
pub trait ParentLookup: Send + Sync {
    /// Parent whose legacy id equals `legacy_id`
    async fn by_legacy_id(&self, legacy_id: &str) -> LookupOutcome;

    /// Parent whose sku equals a variant's `base_sku`
    async fn by_base_sku(&self, base_sku: &str) -> LookupOutcome;
}

/// Result of running both lookup tiers for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked(ParentRef),
    /// Both tiers missed; one failure per tier tried
    Missing(Vec<LookupFailure>),
    /// A tier matched several parents
    Ambiguous(LookupFailure),
}

fn settle(
    strategy: LookupStrategy,
    key: &str,
    outcome: LookupOutcome,
    failures: &mut Vec<LookupFailure>,
) -> Option<LinkOutcome> {
    match outcome {
        LookupOutcome::Found(parent) => Some(LinkOutcome::Linked(parent)),
        LookupOutcome::Ambiguous(matches) => Some(LinkOutcome::Ambiguous(LookupFailure::ambiguous(
            strategy, key, matches,
        ))),
        LookupOutcome::NotFound => {
            failures.push(LookupFailure::missing(strategy, key));
            None
        }
    }
}

/// Run the two-tier lookup for `record` against any [`ParentLookup`]
pub async fn link_parent(lookup: &dyn ParentLookup, record: &TransformedRecord) -> LinkOutcome {
    let mut failures = Vec::new();

    if let Some(parent_id) = record.parent_legacy_id.as_deref() {
        let outcome = lookup.by_legacy_id(parent_id).await;
        if let Some(done) = settle(LookupStrategy::ParentId, parent_id, outcome, &mut failures) {
            return done;
        }
    }

    if record.base_sku.is_empty() {
        failures.push(LookupFailure::missing(LookupStrategy::BaseSku, ""));
    } else {
        let outcome = lookup.by_base_sku(&record.base_sku).await;
        if let Some(done) = settle(LookupStrategy::BaseSku, &record.base_sku, outcome, &mut failures) {
            return done;
        }
    }

    LinkOutcome::Missing(failures)
}

/// Resolved parents seen so far in one run
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    by_legacy_id: HashMap<String, Vec<ParentRef>>,
    by_sku: HashMap<String, Vec<ParentRef>>,
}

impl ParentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolved parent under its legacy id and sku
    pub fn insert(&mut self, record: &TransformedRecord) {
        let parent = record.as_parent_ref();
        if let Some(id) = &record.legacy_id {
            push_unique(self.by_legacy_id.entry(id.clone()).or_default(), parent.clone());
        }
        if !record.sku.is_empty() {
            push_unique(self.by_sku.entry(record.sku.clone()).or_default(), parent);
        }
    }

    /// Number of distinct parents registered by sku
    pub fn len(&self) -> usize {
        self.by_sku.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sku.is_empty() && self.by_legacy_id.is_empty()
    }

    pub fn find_by_legacy_id(&self, legacy_id: &str) -> LookupOutcome {
        outcome_of(self.by_legacy_id.get(legacy_id))
    }

    pub fn find_by_base_sku(&self, base_sku: &str) -> LookupOutcome {
        outcome_of(self.by_sku.get(base_sku))
    }

    /// Two-tier lookup without leaving synchronous code
    pub fn link(&self, record: &TransformedRecord) -> LinkOutcome {
        let mut failures = Vec::new();

        if let Some(parent_id) = record.parent_legacy_id.as_deref() {
            let outcome = self.find_by_legacy_id(parent_id);
            if let Some(done) = settle(LookupStrategy::ParentId, parent_id, outcome, &mut failures) {
                return done;
            }
        }

        if record.base_sku.is_empty() {
            failures.push(LookupFailure::missing(LookupStrategy::BaseSku, ""));
        } else {
            let outcome = self.find_by_base_sku(&record.base_sku);
            if let Some(done) = settle(LookupStrategy::BaseSku, &record.base_sku, outcome, &mut failures) {
                return done;
            }
        }

        LinkOutcome::Missing(failures)
    }
}

fn push_unique(parents: &mut Vec<ParentRef>, parent: ParentRef) {
    if !parents.contains(&parent) {
        parents.push(parent);
    }
}

fn outcome_of(parents: Option<&Vec<ParentRef>>) -> LookupOutcome {
    match parents.map(Vec::as_slice) {
        None | Some([]) => LookupOutcome::NotFound,
        Some([parent]) => LookupOutcome::Found(parent.clone()),
        Some(many) => LookupOutcome::Ambiguous(many.len()),
    }
}

#[async_trait]
impl ParentLookup for ParentIndex {
    async fn by_legacy_id(&self, legacy_id: &str) -> LookupOutcome {
        self.find_by_legacy_id(legacy_id)
    }

    async fn by_base_sku(&self, base_sku: &str) -> LookupOutcome {
        self.find_by_base_sku(base_sku)
    }
}

/// Several lookups asked in order; the first that does not miss answers
pub struct LookupChain<'a> {
    lookups: Vec<&'a dyn ParentLookup>,
}

impl<'a> LookupChain<'a> {
    pub fn new() -> Self {
        Self { lookups: Vec::new() }
    }

    pub fn then(mut self, lookup: &'a dyn ParentLookup) -> Self {
        self.lookups.push(lookup);
        self
    }
}

impl Default for LookupChain<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParentLookup for LookupChain<'_> {
    async fn by_legacy_id(&self, legacy_id: &str) -> LookupOutcome {
        for lookup in &self.lookups {
            match lookup.by_legacy_id(legacy_id).await {
                LookupOutcome::NotFound => continue,
                answer => return answer,
            }
        }
        LookupOutcome::NotFound
    }

    async fn by_base_sku(&self, base_sku: &str) -> LookupOutcome {
        for lookup in &self.lookups {
            match lookup.by_base_sku(base_sku).await {
                LookupOutcome::NotFound => continue,
                answer => return answer,
            }
        }
        LookupOutcome::NotFound
    }
}
