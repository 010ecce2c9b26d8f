// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local durable store: a crash-safe queue of records not yet synced.
//!
//! Three independent collections (calls, cellular usage, Wi-Fi usage) live in
//! one SQLite file, one table each. See [`LocalStore`].

pub mod schema;
pub mod sql;

pub use schema::LocalRecord;
pub use sql::{DrainLock, LocalStore};

use crate::record::{Collection, RecordKind};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Duplicate timestamp {timestamp} in {collection}")]
    DuplicateKey {
        collection: Collection,
        timestamp: u64,
    },
    #[error("Collection {collection} holds {expected} records")]
    KindMismatch {
        collection: Collection,
        expected: RecordKind,
    },
    #[error("Corrupt row in {collection}: {reason}")]
    Corrupt {
        collection: Collection,
        reason: String,
    },
    #[error("{remaining} records left in {collection} after drain")]
    Residual {
        collection: Collection,
        remaining: u64,
    },
}

impl StorageError {
    /// True for the idempotent "already cached" case.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// Cached row counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    pub calls: u64,
    pub cellular_usage: u64,
    pub wifi_usage: u64,
}

impl CollectionCounts {
    #[must_use]
    pub fn get(&self, collection: Collection) -> u64 {
        match collection {
            Collection::Calls => self.calls,
            Collection::CellularUsage => self.cellular_usage,
            Collection::WifiUsage => self.wifi_usage,
        }
    }

    pub(crate) fn set(&mut self, collection: Collection, count: u64) {
        match collection {
            Collection::Calls => self.calls = count,
            Collection::CellularUsage => self.cellular_usage = count,
            Collection::WifiUsage => self.wifi_usage = count,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.calls + self.cellular_usage + self.wifi_usage
    }
}
