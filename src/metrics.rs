// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the telemetry sync layer.
//!
//! Uses the `metrics` crate for backend-agnostic collection. The host
//! application installs the exporter.
//!
//! # Metric Naming Convention
//! - `telemetry_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `collection`: calls, cellular_usage, wifi_usage
//! - `operation`: put, create_domain, select, client
//! - `status`: success, error, timeout
//! - `outcome`: success, failed, retried_success, retried_failed, unavailable

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

use crate::record::Collection;
use crate::storage::CollectionCounts;

/// Record the final outcome of one `run_sync_once`.
pub fn record_sync_attempt(outcome: &str) {
    counter!(
        "telemetry_sync_attempts_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Records acknowledged remotely and removed from the cache.
pub fn record_records_drained(collection: Collection, count: usize) {
    counter!(
        "telemetry_sync_records_drained_total",
        "collection" => collection.to_string()
    )
    .increment(count as u64);
}

/// A collection drain stopped early.
pub fn record_drain_aborted(collection: Collection) {
    counter!(
        "telemetry_sync_drain_aborted_total",
        "collection" => collection.to_string()
    )
    .increment(1);
}

pub fn set_cached_records(counts: &CollectionCounts) {
    for collection in Collection::ALL {
        gauge!(
            "telemetry_sync_cached_records",
            "collection" => collection.to_string()
        )
        .set(counts.get(collection) as f64);
    }
}

pub fn record_remote_call(operation: &str, status: &str) {
    counter!(
        "telemetry_sync_remote_calls_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_domain_created(collection: Collection) {
    counter!(
        "telemetry_sync_domains_created_total",
        "collection" => collection.to_string()
    )
    .increment(1);
}

/// A schedule tick arrived while a sync was in flight.
pub fn record_tick_skipped() {
    counter!("telemetry_sync_ticks_skipped_total").increment(1);
}

pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "telemetry_sync_remote_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_sync_duration(duration: Duration) {
    histogram!("telemetry_sync_run_seconds").record(duration.as_secs_f64());
}

/// A timing guard that records remote latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
