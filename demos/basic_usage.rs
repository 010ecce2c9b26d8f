// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic telemetry-sync usage example.
//!
//! Demonstrates:
//! 1. Opening the local cache
//! 2. Recording calls and a traffic-counter sample
//! 3. A sync attempt while offline (data stays cached)
//! 4. A sync attempt online, draining into the in-memory remote store
//! 5. Querying the remote store back
//! 6. Displaying metrics
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use telemetry_sync::ingest::{record_call, record_counters};
use telemetry_sync::record::now_millis;
use telemetry_sync::{
    CallRecord, CallType, Collection, InMemoryRemoteStore, LocalStore, Location, RemoteAdapter,
    StaticClientProvider, StaticConnectivity, SyncConfig, SyncController, SyncEngine, SyncError,
    TrafficCounters, UsageRecord,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           telemetry-sync: Basic Usage Example                 ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Open the local cache
    // ─────────────────────────────────────────────────────────────────────────
    let dir = tempfile::tempdir()?;
    let config = SyncConfig {
        database_path: dir.path().join("telemetry.db").display().to_string(),
        domain_prefix: "demo".into(),
        ..Default::default()
    };
    let local = Arc::new(LocalStore::open(&config).await?);
    println!("📦 Cache opened at {}", local.path());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Record events
    // ─────────────────────────────────────────────────────────────────────────
    let here = Location::new(52.5200, 13.4050)?;
    let now = now_millis();

    record_call(&local, &CallRecord::new(now - 3_000, "+4930123456", CallType::Incoming, 95, here)).await?;
    record_call(&local, &CallRecord::new(now - 2_000, "+4930654321", CallType::Outgoing, 240, here)).await?;
    record_call(&local, &CallRecord::new(now - 1_000, "+4930999999", CallType::Missed, 0, here)).await?;

    let counters = TrafficCounters {
        total_tx: 12_000_000,
        total_rx: 85_000_000,
        mobile_tx: 2_000_000,
        mobile_rx: 15_000_000,
    };
    record_counters(&local, &counters, now, here).await?;

    let counts = local.counts().await?;
    println!(
        "📝 Cached: {} calls, {} cellular, {} wifi",
        counts.calls, counts.cellular_usage, counts.wifi_usage
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Offline attempt
    // ─────────────────────────────────────────────────────────────────────────
    let remote = Arc::new(InMemoryRemoteStore::with_page_size(2));
    let connectivity = Arc::new(StaticConnectivity::offline());
    let controller = SyncController::new(
        SyncEngine::new(local.clone()),
        Arc::new(StaticClientProvider::new(remote.clone())),
        connectivity.clone(),
        Arc::new(|e: &SyncError| {
            println!("   └─ failure handler saw: {}", e);
            false
        }),
        config.clone(),
    );

    println!("\n📴 Syncing while offline...");
    let outcome = controller.run_sync_once().await;
    println!("   └─ {} (cached total still {})", outcome, local.counts().await?.total());

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Online attempt
    // ─────────────────────────────────────────────────────────────────────────
    connectivity.set_network(true);
    println!("\n📶 Syncing while online...");
    let outcome = controller.run_sync_once().await;
    println!("   └─ {}", outcome);
    if let Some(report) = outcome.report {
        for drain in &report.outcomes {
            println!("      └─ {}", drain);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Read back
    // ─────────────────────────────────────────────────────────────────────────
    let adapter = RemoteAdapter::from_config(remote.clone(), &config);
    let calls: Vec<CallRecord> = adapter.query(Collection::Calls, None, None).await?;
    println!("\n🔍 Remote calls ({} items, paginated by 2):", calls.len());
    for call in &calls {
        println!(
            "   └─ {} {:?} {} ({}s)",
            call.timestamp(),
            call.call_type(),
            call.phone_number(),
            call.duration_secs()
        );
    }

    let wifi: Option<UsageRecord> = adapter.most_recent(Collection::WifiUsage).await?;
    if let Some(sample) = wifi {
        println!("   └─ latest wifi: up {} / down {} bytes", sample.bytes_up(), sample.bytes_down());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📊 Metrics:");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut lines: Vec<String> = vec![];
    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        let rendered = match value {
            DebugValue::Counter(v) => format!("{}", v),
            DebugValue::Gauge(v) => format!("{:.0}", v.into_inner()),
            DebugValue::Histogram(samples) => {
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                format!("{} samples, {:.4}s total", samples.len(), sum)
            }
        };
        lines.push(format!("{}{} = {}", key.name(), label_str, rendered));
    }

    lines.sort();
    for line in lines {
        println!("   └─ {}", line);
    }
}
