// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The drain loop.
//!
//! ```text
//! for collection in [calls, cellular_usage, wifi_usage]:
//!     lock collection for writing
//!     for record in list_all(collection)      (oldest first)
//!         remote.put(record)      ── fails ──► stop this collection
//!         local.delete(record)    ── fails ──► stop this collection
//!     count(collection) > 0       ──────────► collection not drained
//! ```
//!
//! A record leaves the cache only after its put was acknowledged, so a
//! crash between the two steps just means an idempotent re-put next time.
//! Inserts that arrive while a collection is locked land after the drain
//! and go out on the next pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::types::{DrainOutcome, SyncReport};
use crate::metrics;
use crate::record::{CallRecord, Collection, RecordKind, UsageRecord};
use crate::remote::{RemoteAdapter, RemoteRecord};
use crate::storage::{LocalRecord, LocalStore, StorageError};

pub struct SyncEngine {
    local: Arc<LocalStore>,
    draining: AtomicBool,
}

impl SyncEngine {
    pub fn new(local: Arc<LocalStore>) -> Self {
        Self {
            local,
            draining: AtomicBool::new(false),
        }
    }

    pub fn local(&self) -> &Arc<LocalStore> {
        &self.local
    }

    /// True while a pass is running.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Drain every collection. A failing collection does not prevent the
    /// next one from being attempted.
    #[tracing::instrument(skip_all)]
    pub async fn run(&self, remote: &RemoteAdapter) -> SyncReport {
        let _guard = DrainGuard::engage(&self.draining);
        let start = Instant::now();

        let mut report = SyncReport::default();
        for collection in Collection::ALL {
            let outcome = match collection.kind() {
                RecordKind::Call => self.drain::<CallRecord>(remote, collection).await,
                RecordKind::Usage => self.drain::<UsageRecord>(remote, collection).await,
            };
            report.outcomes.push(outcome);
        }

        if report.is_success() && report.total_drained() > 0 {
            if let Err(e) = self.local.checkpoint().await {
                warn!(error = %e, "Failed to checkpoint cache after drain");
            }
        }

        match self.local.counts().await {
            Ok(counts) => metrics::set_cached_records(&counts),
            Err(e) => warn!(error = %e, "Failed to read cache counts"),
        }
        metrics::record_sync_duration(start.elapsed());

        info!(
            success = report.is_success(),
            drained = report.total_drained(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sync pass complete"
        );
        report
    }

    async fn drain<R>(&self, remote: &RemoteAdapter, collection: Collection) -> DrainOutcome
    where
        R: LocalRecord + RemoteRecord,
    {
        let mut outcome = DrainOutcome::new(collection);
        let lock = self.local.lock_for_drain(collection).await;

        let records: Vec<R> = match lock.list_all().await {
            Ok(records) => records,
            Err(e) => {
                error!(%collection, error = %e, "Failed to list cached records");
                outcome.error = Some(e.into());
                metrics::record_drain_aborted(collection);
                return outcome;
            }
        };

        if records.is_empty() {
            debug!(%collection, "Nothing cached");
        } else {
            info!(%collection, pending = records.len(), "Draining collection");
        }

        for record in &records {
            let timestamp = LocalRecord::timestamp(record);
            outcome.attempted += 1;

            if let Err(e) = remote.put(collection, record).await {
                warn!(
                    %collection,
                    timestamp,
                    drained = outcome.drained,
                    remaining = records.len() - outcome.drained,
                    error = %e,
                    "Remote put failed, stopping drain"
                );
                outcome.error = Some(e);
                break;
            }

            match lock.delete_by_key(timestamp).await {
                Ok(removed) => {
                    if !removed {
                        debug!(%collection, timestamp, "Record already gone from cache");
                    }
                    outcome.drained += 1;
                }
                Err(e) => {
                    // Acknowledged remotely but still cached: the next pass re-puts it
                    error!(%collection, timestamp, error = %e, "Failed to remove synced record");
                    outcome.error = Some(e.into());
                    break;
                }
            }
        }

        if outcome.error.is_none() {
            match lock.count().await {
                Ok(0) => {}
                Ok(remaining) => {
                    warn!(%collection, remaining, "Records left in cache after drain");
                    outcome.error = Some(StorageError::Residual { collection, remaining }.into());
                }
                Err(e) => outcome.error = Some(e.into()),
            }
        }
        drop(lock);

        metrics::record_records_drained(collection, outcome.drained);
        if outcome.error.is_some() {
            metrics::record_drain_aborted(collection);
        } else {
            info!(%collection, drained = outcome.drained, "Collection drained");
        }
        outcome
    }
}

/// Clears the draining flag on drop, including on panic.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::record::{CallType, Location};
    use crate::remote::InMemoryRemoteStore;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup() -> (SyncEngine, Arc<InMemoryRemoteStore>, RemoteAdapter, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            database_path: dir.path().join("engine.db").display().to_string(),
            ..Default::default()
        };
        let local = Arc::new(LocalStore::open(&config).await.unwrap());
        let remote = Arc::new(InMemoryRemoteStore::new());
        let adapter = RemoteAdapter::new(remote.clone(), "user", Duration::from_secs(5));
        (SyncEngine::new(local), remote, adapter, dir)
    }

    #[tokio::test]
    async fn test_empty_cache_is_success() {
        let (engine, remote, adapter, _dir) = setup().await;

        let report = engine.run(&adapter).await;

        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.total_drained(), 0);
        assert_eq!(remote.counts().puts, 0);
        assert!(!engine.is_draining());
    }

    #[tokio::test]
    async fn test_drains_all_collections() {
        let (engine, remote, adapter, _dir) = setup().await;
        let local = engine.local().clone();

        for ts in [3, 1, 2] {
            let call = CallRecord::new(ts, "555", CallType::Outgoing, ts, Location::UNKNOWN);
            local.insert(Collection::Calls, &call).await.unwrap();
        }
        let sample = UsageRecord::new(10, 1, 2, Location::UNKNOWN);
        local.insert(Collection::CellularUsage, &sample).await.unwrap();
        local.insert(Collection::WifiUsage, &sample).await.unwrap();

        let report = engine.run(&adapter).await;

        assert!(report.is_success(), "{}", report);
        assert_eq!(report.total_drained(), 5);
        assert_eq!(local.counts().await.unwrap().total(), 0);
        assert_eq!(remote.item_count("user_call"), Some(3));
        assert_eq!(remote.item_count("user_mobile"), Some(1));
        assert_eq!(remote.item_count("user_wifi"), Some(1));
    }
}
