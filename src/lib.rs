// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Telemetry Sync
//!
//! A background cache-and-sync layer for device telemetry: phone calls and
//! cellular / Wi-Fi data-usage samples are cached locally the moment they are
//! captured, then drained to a remote key-value store on a schedule.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Event Sources                          │
//! │  • Call log, traffic counters, location (host supplied)     │
//! │  • ingest::record_call / record_usage_pair                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Local Durable Store                       │
//! │  • SQLite (WAL mode), one table per collection              │
//! │  • Timestamp is the key, inserts never overwrite            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              (timer tick → controller → sync engine)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Remote Store Adapter                      │
//! │  • Zero-padded attributes, item name = padded timestamp     │
//! │  • Lazy domain creation, consistent paginated reads         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are deleted locally only after the remote put is acknowledged.
//! A failed put stops that collection's drain so nothing is skipped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use telemetry_sync::{
//!     CallRecord, CallType, Collection, InMemoryRemoteStore, LocalStore, Location,
//!     StaticClientProvider, StaticConnectivity, SyncConfig, SyncController, SyncEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::default();
//!     let local = Arc::new(LocalStore::open(&config).await?);
//!
//!     let call = CallRecord::new(1000, "555-1234", CallType::Outgoing, 42, Location::UNKNOWN);
//!     local.insert(Collection::Calls, &call).await?;
//!
//!     let remote = Arc::new(InMemoryRemoteStore::new());
//!     let controller = SyncController::new(
//!         SyncEngine::new(local.clone()),
//!         Arc::new(StaticClientProvider::new(remote)),
//!         Arc::new(StaticConnectivity::online()),
//!         Arc::new(|_: &telemetry_sync::SyncError| false),
//!         config,
//!     );
//!
//!     let outcome = controller.run_sync_once().await;
//!     assert!(outcome.is_success());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`record`]: call and usage value types, collections
//! - [`codec`]: order-preserving zero-padded encodings
//! - [`storage`]: the local durable queue
//! - [`remote`]: remote store trait, adapter and in-memory store
//! - [`sync`]: the drain engine
//! - [`controller`]: preconditions, failure policy, tick handling
//! - [`ingest`]: helpers for event sources

pub mod config;
pub mod error;
pub mod record;
pub mod codec;
pub mod storage;
pub mod remote;
pub mod sync;
pub mod controller;
pub mod ingest;
pub mod resilience;
pub mod metrics;

pub use config::SyncConfig;
pub use error::SyncError;
pub use record::{CallRecord, CallType, Collection, Location, RecordError, RecordKind, UsageRecord};
pub use storage::{CollectionCounts, DrainLock, LocalRecord, LocalStore, StorageError};
pub use remote::{
    Attribute, InMemoryRemoteStore, RemoteAdapter, RemoteCallCounts, RemoteClientProvider,
    RemoteError, RemoteRecord, RemoteStore, SelectPage, SelectRequest, SortOrder,
    StaticClientProvider,
};
pub use sync::{DrainOutcome, SyncEngine, SyncReport};
pub use controller::{
    ConnectivityProbe, FailureHandler, StaticConnectivity, SyncController, SyncOutcome,
    TickOutcome,
};
pub use controller::schedule::ScheduleHandle;
pub use ingest::TrafficCounters;
pub use resilience::retry::RetryConfig;
pub use metrics::LatencyTimer;
