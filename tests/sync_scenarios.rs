//! End-to-end sync scenarios against a real SQLite cache and the
//! in-memory remote store.
//!
//! Run with: `cargo test --test sync_scenarios`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use telemetry_sync::codec::encode_timestamp;
use telemetry_sync::ingest::{record_call, record_counters};
use telemetry_sync::{
    CallRecord, CallType, Collection, InMemoryRemoteStore, LocalStore, Location, RemoteAdapter,
    StaticClientProvider, StaticConnectivity, SyncConfig, SyncController, SyncEngine, SyncError,
    TrafficCounters, UsageRecord,
};

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    local: Arc<LocalStore>,
    remote: Arc<InMemoryRemoteStore>,
    connectivity: Arc<StaticConnectivity>,
    handler_calls: Arc<AtomicUsize>,
    controller: SyncController,
    config: SyncConfig,
    _dir: TempDir,
}

async fn harness(remote: InMemoryRemoteStore) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        database_path: dir.path().join("scenarios.db").display().to_string(),
        domain_prefix: "user".into(),
        ..Default::default()
    };

    let local = Arc::new(LocalStore::open(&config).await.unwrap());
    let remote = Arc::new(remote);
    let connectivity = Arc::new(StaticConnectivity::online());
    let handler_calls = Arc::new(AtomicUsize::new(0));

    let counter = handler_calls.clone();
    let controller = SyncController::new(
        SyncEngine::new(local.clone()),
        Arc::new(StaticClientProvider::new(remote.clone())),
        connectivity.clone(),
        Arc::new(move |_: &SyncError| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        }),
        config.clone(),
    );

    Harness {
        local,
        remote,
        connectivity,
        handler_calls,
        controller,
        config,
        _dir: dir,
    }
}

fn call(ts: u64) -> CallRecord {
    CallRecord::new(ts, format!("+1555{:07}", ts), CallType::Outgoing, ts % 600, Location::UNKNOWN)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_single_call_syncs_and_leaves_cache_empty() {
    let h = harness(InMemoryRemoteStore::new()).await;

    h.local.insert(Collection::Calls, &call(1000)).await.unwrap();
    let outcome = h.controller.run_sync_once().await;

    assert!(outcome.is_success(), "{}", outcome);
    assert_eq!(h.local.count(Collection::Calls).await.unwrap(), 0);
    assert_eq!(h.remote.item_names("user_call"), vec![encode_timestamp(1000)]);
    assert_eq!(h.handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_offline_never_contacts_remote() {
    let h = harness(InMemoryRemoteStore::new()).await;
    h.connectivity.set_network(false);

    h.local.insert(Collection::Calls, &call(1000)).await.unwrap();
    let outcome = h.controller.run_sync_once().await;

    assert!(!outcome.is_success());
    assert!(matches!(outcome.error, Some(SyncError::RemoteUnavailable { .. })));
    assert_eq!(h.handler_calls.load(Ordering::SeqCst), 1);

    let counts = h.remote.counts();
    assert_eq!(counts.puts + counts.creates + counts.selects, 0);
    assert_eq!(h.local.count(Collection::Calls).await.unwrap(), 1);

    // Back online: the cached call goes out on the next attempt
    h.connectivity.set_network(true);
    assert!(h.controller.run_sync_once().await.is_success());
    assert_eq!(h.local.count(Collection::Calls).await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_domain_is_created_once() {
    let h = harness(InMemoryRemoteStore::new()).await;

    h.local.insert(Collection::Calls, &call(1)).await.unwrap();
    let outcome = h.controller.run_sync_once().await;

    assert!(outcome.is_success());
    let counts = h.remote.counts();
    assert_eq!(counts.creates, 1);
    assert_eq!(counts.puts, 2);
    assert!(h.remote.has_domain("user_call"));
    assert!(!h.remote.has_domain("user_wifi"));
}

#[tokio::test]
async fn test_full_success_empties_every_collection() {
    let h = harness(InMemoryRemoteStore::new()).await;

    for ts in [5_000, 1_000, 3_000] {
        record_call(&h.local, &call(ts)).await.unwrap();
    }
    for (i, ts) in [10_000u64, 20_000, 30_000].into_iter().enumerate() {
        let counters = TrafficCounters {
            total_tx: 1_000 * (i as u64 + 1),
            total_rx: 9_000 * (i as u64 + 1),
            mobile_tx: 100,
            mobile_rx: 900,
        };
        record_counters(&h.local, &counters, ts, Location::new(48.85, 2.35).unwrap())
            .await
            .unwrap();
    }

    let outcome = h.controller.run_sync_once().await;
    let report = outcome.report.as_ref().unwrap();

    assert!(outcome.is_success(), "{}", outcome);
    assert_eq!(report.total_drained(), 9);
    assert_eq!(report.outcome(Collection::Calls).unwrap().drained, 3);
    assert_eq!(h.local.counts().await.unwrap().total(), 0);
    assert_eq!(h.remote.item_count("user_call"), Some(3));
    assert_eq!(h.remote.item_count("user_mobile"), Some(3));
    assert_eq!(h.remote.item_count("user_wifi"), Some(3));
}

#[tokio::test]
async fn test_synced_records_query_back_in_order() {
    let h = harness(InMemoryRemoteStore::with_page_size(2)).await;

    for ts in [40, 10, 30, 20, 50] {
        h.local.insert(Collection::Calls, &call(ts)).await.unwrap();
    }
    assert!(h.controller.run_sync_once().await.is_success());

    let adapter = RemoteAdapter::from_config(h.remote.clone(), &h.config);
    let all: Vec<CallRecord> = adapter.query(Collection::Calls, None, None).await.unwrap();
    assert_eq!(all, vec![call(10), call(20), call(30), call(40), call(50)]);

    let middle: Vec<CallRecord> = adapter.query(Collection::Calls, Some(20), Some(40)).await.unwrap();
    assert_eq!(middle.len(), 3);

    let newest: Option<CallRecord> = adapter.most_recent(Collection::Calls).await.unwrap();
    assert_eq!(newest, Some(call(50)));

    assert_eq!(h.remote.counts().inconsistent_selects, 0);
}

#[tokio::test]
async fn test_resync_of_same_timestamp_overwrites_remotely() {
    let h = harness(InMemoryRemoteStore::new()).await;

    let first = UsageRecord::new(777, 1, 1, Location::UNKNOWN);
    h.local.insert(Collection::WifiUsage, &first).await.unwrap();
    assert!(h.controller.run_sync_once().await.is_success());

    // Cache is empty again, so the same key can be cached and sent twice
    let second = UsageRecord::new(777, 2, 2, Location::UNKNOWN);
    h.local.insert(Collection::WifiUsage, &second).await.unwrap();
    assert!(h.controller.run_sync_once().await.is_success());

    assert_eq!(h.remote.item_count("user_wifi"), Some(1));
    let adapter = RemoteAdapter::from_config(h.remote.clone(), &h.config);
    let stored: Vec<UsageRecord> = adapter.query(Collection::WifiUsage, None, None).await.unwrap();
    assert_eq!(stored, vec![second]);
}

#[tokio::test]
async fn test_duplicate_insert_keeps_one_row() {
    let h = harness(InMemoryRemoteStore::new()).await;

    h.local.insert(Collection::Calls, &call(1000)).await.unwrap();
    let err = h.local.insert(Collection::Calls, &call(1000)).await.unwrap_err();

    assert!(err.is_duplicate());
    assert_eq!(h.local.count(Collection::Calls).await.unwrap(), 1);
}

#[tokio::test]
async fn test_cache_survives_restart_and_drains_later() {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        database_path: dir.path().join("restart.db").display().to_string(),
        ..Default::default()
    };

    {
        let local = LocalStore::open(&config).await.unwrap();
        for ts in 1..=3 {
            local.insert(Collection::Calls, &call(ts)).await.unwrap();
        }
    }

    let local = Arc::new(LocalStore::open(&config).await.unwrap());
    assert_eq!(local.count(Collection::Calls).await.unwrap(), 3);

    let remote = Arc::new(InMemoryRemoteStore::new());
    let controller = SyncController::new(
        SyncEngine::new(local.clone()),
        Arc::new(StaticClientProvider::new(remote.clone())),
        Arc::new(StaticConnectivity::online()),
        Arc::new(|_: &SyncError| false),
        config,
    );

    assert!(controller.run_sync_once().await.is_success());
    assert_eq!(local.count(Collection::Calls).await.unwrap(), 0);
    assert_eq!(remote.item_count("user_call"), Some(3));
}

#[tokio::test]
async fn test_background_data_disabled_blocks_sync() {
    let h = harness(InMemoryRemoteStore::new()).await;
    h.connectivity.set_background_data(false);

    h.local.insert(Collection::Calls, &call(1)).await.unwrap();
    let outcome = h.controller.run_sync_once().await;

    assert!(matches!(
        outcome.error,
        Some(SyncError::RemoteUnavailable { ref reason }) if reason.contains("background")
    ));
    assert_eq!(h.remote.counts().puts, 0);
}
