//! Deferred parent resolution
//!
//! Variants whose parent is unknown when they are transformed wait here until
//! the whole batch has been seen, then get a bounded number of retries.

use std::time::Duration;

use super::lookup::{LinkOutcome, ParentLookup, link_parent};
use super::types::{
    LookupFailure, PendingVariant, ResolutionReport, ResolvedVariant, TransformedRecord,
    UnresolvedReason, UnresolvedRelationship,
};
use crate::api::RawRecord;

/// Queue of variants waiting for their parent, owned by one sync run
#[derive(Debug, Default)]
pub struct PendingRelationshipResolver {
    pending: Vec<PendingVariant>,
}

impl PendingRelationshipResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, transformed: TransformedRecord, raw: RawRecord) {
        log::debug!("Deferring {} until its parent is known", transformed.label());
        self.pending.push(PendingVariant::new(transformed, raw));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[PendingVariant] {
        &self.pending
    }

    /// Retry every pending variant against `lookup`
    ///
    /// Each attempt runs both lookup tiers for every item still pending and
    /// waits `backoff` before the next one, but not after the last. Ambiguous
    /// matches fail at once. The queue is empty afterwards; everything it held
    /// is in the report.
    pub async fn resolve_all(
        &mut self,
        lookup: &dyn ParentLookup,
        max_attempts: u32,
        backoff: Duration,
    ) -> ResolutionReport {
        let max_attempts = max_attempts.max(1);
        let mut report = ResolutionReport::default();
        let mut waiting: Vec<(PendingVariant, Vec<LookupFailure>)> =
            self.pending.drain(..).map(|v| (v, Vec::new())).collect();

        for attempt in 1..=max_attempts {
            if waiting.is_empty() {
                break;
            }
            log::debug!(
                "Resolution attempt {}/{}: {} pending",
                attempt,
                max_attempts,
                waiting.len()
            );

            let mut still_waiting = Vec::with_capacity(waiting.len());
            for (mut variant, _) in waiting {
                variant.attempts = attempt;
                match link_parent(lookup, &variant.transformed).await {
                    LinkOutcome::Linked(parent) => {
                        log::debug!(
                            "Linked {} to {} on attempt {}",
                            variant.transformed.label(),
                            parent,
                            attempt
                        );
                        let mut record = variant.transformed;
                        record.parent_ref = Some(parent);
                        report.resolved.push(ResolvedVariant {
                            record,
                            attempts: attempt,
                        });
                    }
                    LinkOutcome::Ambiguous(failure) => {
                        let unresolved = UnresolvedRelationship {
                            variant,
                            reason: UnresolvedReason::AmbiguousParent,
                            failures: vec![failure],
                        };
                        log::warn!("{}", unresolved);
                        report.unresolved.push(unresolved);
                    }
                    LinkOutcome::Missing(failures) => still_waiting.push((variant, failures)),
                }
            }
            waiting = still_waiting;

            if !waiting.is_empty() && attempt < max_attempts && !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
        }

        for (variant, failures) in waiting {
            let unresolved = UnresolvedRelationship {
                variant,
                reason: UnresolvedReason::RetriesExhausted,
                failures,
            };
            log::warn!("{}", unresolved);
            report.unresolved.push(unresolved);
        }

        report
    }
}
