// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Results of a sync pass.

use crate::error::SyncError;
use crate::record::Collection;

/// What happened to one collection during a pass.
#[derive(Debug, Clone)]
pub struct DrainOutcome {
    pub collection: Collection,
    /// Remote puts issued (including the one that failed, if any)
    pub attempted: usize,
    /// Records acknowledged remotely and removed locally
    pub drained: usize,
    /// Why the drain stopped early
    pub error: Option<SyncError>,
}

impl DrainOutcome {
    #[must_use]
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            attempted: 0,
            drained: 0,
            error: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl std::fmt::Display for DrainOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.error {
            None => write!(f, "{}: drained {}", self.collection, self.drained),
            Some(ref e) => write!(
                f,
                "{}: drained {} of {} attempted, stopped: {}",
                self.collection, self.drained, self.attempted, e
            ),
        }
    }
}

/// One [`DrainOutcome`] per collection, in drain order.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: Vec<DrainOutcome>,
}

impl SyncReport {
    /// True only when every collection drained fully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(DrainOutcome::is_success)
    }

    #[must_use]
    pub fn total_drained(&self) -> usize {
        self.outcomes.iter().map(|o| o.drained).sum()
    }

    #[must_use]
    pub fn outcome(&self, collection: Collection) -> Option<&DrainOutcome> {
        self.outcomes.iter().find(|o| o.collection == collection)
    }

    /// The first failure in drain order.
    #[must_use]
    pub fn first_error(&self) -> Option<&SyncError> {
        self.outcomes.iter().find_map(|o| o.error.as_ref())
    }

    pub fn errors(&self) -> impl Iterator<Item = &SyncError> {
        self.outcomes.iter().filter_map(|o| o.error.as_ref())
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.outcomes.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join("; "))
    }
}
