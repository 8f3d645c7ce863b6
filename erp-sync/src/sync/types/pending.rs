//! Deferred variants and the outcome of resolving them

use serde::Serialize;

use super::record::TransformedRecord;
use crate::api::RawRecord;

/// A variant whose parent was not found when it was transformed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingVariant {
    pub transformed: TransformedRecord,
    pub raw: RawRecord,
    /// Resolution attempts made so far
    pub attempts: u32,
}

impl PendingVariant {
    pub fn new(transformed: TransformedRecord, raw: RawRecord) -> Self {
        Self {
            transformed,
            raw,
            attempts: 0,
        }
    }
}

/// Which lookup was tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStrategy {
    ParentId,
    BaseSku,
}

impl std::fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupStrategy::ParentId => write!(f, "parent id"),
            LookupStrategy::BaseSku => write!(f, "base sku"),
        }
    }
}

/// One failed lookup: nothing matched, or too much did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    pub strategy: LookupStrategy,
    pub key: String,
    /// Number of parents matching the key; 0 means missing
    pub matches: usize,
}

impl LookupFailure {
    pub fn missing(strategy: LookupStrategy, key: impl Into<String>) -> Self {
        Self {
            strategy,
            key: key.into(),
            matches: 0,
        }
    }

    pub fn ambiguous(strategy: LookupStrategy, key: impl Into<String>, matches: usize) -> Self {
        Self {
            strategy,
            key: key.into(),
            matches,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.matches > 1
    }
}

impl std::fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_empty() {
            write!(f, "{} unavailable", self.strategy)
        } else if self.matches == 0 {
            write!(f, "{} '{}' not found", self.strategy, self.key)
        } else {
            write!(f, "{} '{}' matched {} parents", self.strategy, self.key, self.matches)
        }
    }
}

/// A variant linked to its parent by the resolver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedVariant {
    pub record: TransformedRecord,
    /// Attempt on which the parent was found
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No parent found within the retry budget
    RetriesExhausted,
    /// Several parents matched; never retried
    AmbiguousParent,
}

/// A variant that lost its parent link, with the lookups that failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedRelationship {
    pub variant: PendingVariant,
    pub reason: UnresolvedReason,
    pub failures: Vec<LookupFailure>,
}

impl std::fmt::Display for UnresolvedRelationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let failures = self
            .failures
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self.reason {
            UnresolvedReason::RetriesExhausted => write!(
                f,
                "{}: no parent after {} attempts ({})",
                self.variant.transformed.label(),
                self.variant.attempts,
                failures
            ),
            UnresolvedReason::AmbiguousParent => write!(
                f,
                "{}: ambiguous parent ({})",
                self.variant.transformed.label(),
                failures
            ),
        }
    }
}

/// Result of [`crate::sync::PendingRelationshipResolver::resolve_all`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionReport {
    pub resolved: Vec<ResolvedVariant>,
    pub unresolved: Vec<UnresolvedRelationship>,
}

impl ResolutionReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}
