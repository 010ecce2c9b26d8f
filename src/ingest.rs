// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Entry points for event sources.
//!
//! Event sources may fire more than once for the same event (a call-log
//! observer, a repeated counter poll). These helpers treat an already
//! cached timestamp as success so callers need not track what they sent.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{CallRecord, Collection, Location, UsageRecord};
use crate::storage::{LocalRecord, LocalStore, StorageError};

/// Cache a finished call. Returns `false` if it was already cached.
pub async fn record_call(store: &LocalStore, call: &CallRecord) -> Result<bool, StorageError> {
    insert_idempotent(store, Collection::Calls, call).await
}

/// Cache one cellular and one Wi-Fi sample taken together.
///
/// Returns whether each sample was newly inserted.
pub async fn record_usage_pair(
    store: &LocalStore,
    cellular: &UsageRecord,
    wifi: &UsageRecord,
) -> Result<(bool, bool), StorageError> {
    let cellular_new = insert_idempotent(store, Collection::CellularUsage, cellular).await?;
    let wifi_new = insert_idempotent(store, Collection::WifiUsage, wifi).await?;
    Ok((cellular_new, wifi_new))
}

/// Read the device counters, split them and cache both samples.
pub async fn record_counters(
    store: &LocalStore,
    counters: &TrafficCounters,
    timestamp: u64,
    location: Location,
) -> Result<(bool, bool), StorageError> {
    let (cellular, wifi) = counters.split(timestamp, location);
    record_usage_pair(store, &cellular, &wifi).await
}

async fn insert_idempotent<R: LocalRecord>(
    store: &LocalStore,
    collection: Collection,
    record: &R,
) -> Result<bool, StorageError> {
    match store.insert(collection, record).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_duplicate() => {
            debug!(%collection, timestamp = record.timestamp(), "Already cached, ignoring");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Cumulative byte counters as reported by the OS.
///
/// The OS only exposes totals and the mobile share; Wi-Fi is derived as
/// `total - mobile`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCounters {
    pub total_tx: u64,
    pub total_rx: u64,
    pub mobile_tx: u64,
    pub mobile_rx: u64,
}

impl TrafficCounters {
    /// `(cellular, wifi)` cumulative samples stamped with `timestamp`.
    ///
    /// Counter reads are not atomic, so mobile can briefly exceed total;
    /// Wi-Fi then saturates at zero.
    #[must_use]
    pub fn split(&self, timestamp: u64, location: Location) -> (UsageRecord, UsageRecord) {
        let cellular = UsageRecord::new(timestamp, self.mobile_tx, self.mobile_rx, location);
        let wifi = UsageRecord::new(
            timestamp,
            self.total_tx.saturating_sub(self.mobile_tx),
            self.total_rx.saturating_sub(self.mobile_rx),
            location,
        );
        (cellular, wifi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::record::CallType;
    use tempfile::TempDir;

    async fn store() -> (LocalStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            database_path: dir.path().join("ingest.db").display().to_string(),
            ..Default::default()
        };
        (LocalStore::open(&config).await.unwrap(), dir)
    }

    #[test]
    fn test_split_derives_wifi() {
        let counters = TrafficCounters {
            total_tx: 1_000,
            total_rx: 5_000,
            mobile_tx: 400,
            mobile_rx: 4_500,
        };
        let (cell, wifi) = counters.split(7, Location::UNKNOWN);

        assert_eq!((cell.bytes_up(), cell.bytes_down()), (400, 4_500));
        assert_eq!((wifi.bytes_up(), wifi.bytes_down()), (600, 500));
        assert_eq!(wifi.timestamp(), 7);
        assert!(!wifi.is_delta());
    }

    #[test]
    fn test_split_saturates() {
        let counters = TrafficCounters {
            total_tx: 10,
            total_rx: 10,
            mobile_tx: 12,
            mobile_rx: 3,
        };
        let (_, wifi) = counters.split(1, Location::UNKNOWN);
        assert_eq!(wifi.bytes_up(), 0);
        assert_eq!(wifi.bytes_down(), 7);
    }

    #[tokio::test]
    async fn test_record_call_is_idempotent() {
        let (store, _dir) = store().await;
        let call = CallRecord::new(1000, "555-1234", CallType::Outgoing, 42, Location::UNKNOWN);

        assert!(record_call(&store, &call).await.unwrap());
        assert!(!record_call(&store, &call).await.unwrap());
        assert_eq!(store.count(Collection::Calls).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_counters() {
        let (store, _dir) = store().await;
        let counters = TrafficCounters {
            total_tx: 100,
            total_rx: 200,
            mobile_tx: 10,
            mobile_rx: 20,
        };

        assert_eq!(record_counters(&store, &counters, 50, Location::UNKNOWN).await.unwrap(), (true, true));
        assert_eq!(record_counters(&store, &counters, 50, Location::UNKNOWN).await.unwrap(), (false, false));

        let wifi: Vec<UsageRecord> = store.list_all(Collection::WifiUsage).await.unwrap();
        assert_eq!(wifi[0].bytes_up(), 90);
    }
}
