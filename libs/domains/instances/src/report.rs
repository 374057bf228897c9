//! Per-service accounting of skipped records.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::{CollectError, SkipReason};
use crate::models::ServiceKind;

/// Skip counters for one service run.
///
/// Warnings for unmapped terms and unresolvable locations are emitted once
/// per distinct value; repeats only bump the counter.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub service: ServiceKind,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub unmapped_terms: BTreeSet<String>,
    pub unresolved_locations: BTreeSet<String>,
}

impl CollectionReport {
    pub fn new(service: ServiceKind) -> Self {
        Self {
            service,
            skipped: BTreeMap::new(),
            unmapped_terms: BTreeSet::new(),
            unresolved_locations: BTreeSet::new(),
        }
    }

    /// Count a recovered error and log it at the level its kind calls for.
    pub fn record(&mut self, error: &CollectError) {
        let reason = error.reason();
        *self.skipped.entry(reason).or_default() += 1;

        match error {
            CollectError::UnresolvableRegion { location } => {
                if self.unresolved_locations.insert(location.clone()) {
                    warn!(service = %self.service, location = %location, "Skipping records for unknown location");
                }
            }
            CollectError::UnmappedTerm(term) if reason == SkipReason::UnmappedTerm => {
                if self.unmapped_terms.insert(term.to_string()) {
                    warn!(service = %self.service, term = %term, "Skipping unmapped reserved term");
                }
            }
            CollectError::OrphanPricingRecord { .. } | CollectError::UnmappedTerm(_) => {
                debug!(service = %self.service, error = %error, "Skipping record");
            }
            _ => {
                warn!(service = %self.service, error = %error, "Skipping record");
            }
        }
    }

    /// Count a skip that carries no error value (filters and exclusions).
    pub fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn merge(&mut self, other: CollectionReport) {
        for (reason, count) in other.skipped {
            *self.skipped.entry(reason).or_default() += count;
        }
        self.unmapped_terms.extend(other.unmapped_terms);
        self.unresolved_locations.extend(other.unresolved_locations);
    }
}
