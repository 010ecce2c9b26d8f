// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Decides when a sync pass may run and what happens when it fails.
//!
//! # Attempt lifecycle
//!
//! ```text
//! run_sync_once()
//!   │  wait for in-flight lock
//!   ├─ background data off / no network ──► RemoteUnavailable
//!   ├─ client() + engine.run()
//!   │
//!   └─ failed? ──► handler.handle_failure(err)
//!                    ├─ false ──► done (failure)
//!                    └─ true  ──► client() + engine.run() once more, final
//! ```
//!
//! The retry skips the precondition check: the handler has already
//! decided the attempt is worth making.

pub mod schedule;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::metrics::{self, LatencyTimer};
use crate::remote::{RemoteAdapter, RemoteClientProvider, RemoteError, RemoteStore};
use crate::sync::{SyncEngine, SyncReport};

/// Host-provided view of the device's connectivity.
pub trait ConnectivityProbe: Send + Sync {
    /// The user allows background data use.
    fn background_data_allowed(&self) -> bool;
    fn has_active_network(&self) -> bool;
}

/// Flags the host flips from its own connectivity callbacks.
#[derive(Debug)]
pub struct StaticConnectivity {
    background_data: AtomicBool,
    network: AtomicBool,
}

impl StaticConnectivity {
    #[must_use]
    pub fn new(background_data: bool, network: bool) -> Self {
        Self {
            background_data: AtomicBool::new(background_data),
            network: AtomicBool::new(network),
        }
    }

    #[must_use]
    pub fn online() -> Self {
        Self::new(true, true)
    }

    #[must_use]
    pub fn offline() -> Self {
        Self::new(true, false)
    }

    pub fn set_background_data(&self, allowed: bool) {
        self.background_data.store(allowed, Ordering::Release);
    }

    pub fn set_network(&self, active: bool) {
        self.network.store(active, Ordering::Release);
    }
}

impl ConnectivityProbe for StaticConnectivity {
    fn background_data_allowed(&self) -> bool {
        self.background_data.load(Ordering::Acquire)
    }

    fn has_active_network(&self) -> bool {
        self.network.load(Ordering::Acquire)
    }
}

/// Consulted exactly once per failed attempt. Returning `true` requests a
/// single immediate retry with a freshly obtained client.
#[async_trait]
pub trait FailureHandler: Send + Sync {
    async fn handle_failure(&self, error: &SyncError) -> bool;
}

#[async_trait]
impl<F> FailureHandler for F
where
    F: Fn(&SyncError) -> bool + Send + Sync,
{
    async fn handle_failure(&self, error: &SyncError) -> bool {
        self(error)
    }
}

/// Result of `run_sync_once`.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Report of the last engine pass, if the engine ran at all
    pub report: Option<SyncReport>,
    /// First failure of the final attempt
    pub error: Option<SyncError>,
    /// The failure handler asked for (and got) a retry
    pub retried: bool,
}

impl SyncOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let retried = if self.retried { " (after retry)" } else { "" };
        match self.error {
            None => write!(f, "success{}", retried),
            Some(ref e) => write!(f, "failed{}: {}", retried, e),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TickOutcome {
    Completed(SyncOutcome),
    /// A sync was already in flight; the tick was dropped.
    Skipped,
}

impl TickOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(outcome) if outcome.is_success())
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

struct Attempt {
    report: Option<SyncReport>,
    error: Option<SyncError>,
}

pub struct SyncController {
    engine: SyncEngine,
    clients: Arc<dyn RemoteClientProvider>,
    connectivity: Arc<dyn ConnectivityProbe>,
    handler: Arc<dyn FailureHandler>,
    config: SyncConfig,
    in_flight: Mutex<()>,
}

impl SyncController {
    pub fn new(
        engine: SyncEngine,
        clients: Arc<dyn RemoteClientProvider>,
        connectivity: Arc<dyn ConnectivityProbe>,
        handler: Arc<dyn FailureHandler>,
        config: SyncConfig,
    ) -> Self {
        Self {
            engine,
            clients,
            connectivity,
            handler,
            config,
            in_flight: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// True while a sync holds the in-flight lock.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Run one sync, waiting for any in-flight sync to finish first.
    pub async fn run_sync_once(&self) -> SyncOutcome {
        let _permit = self.in_flight.lock().await;
        self.run_locked().await
    }

    /// Timer entry point. Overlapping ticks are dropped, not queued.
    pub async fn on_schedule_tick(&self) -> TickOutcome {
        match self.in_flight.try_lock() {
            Ok(_permit) => TickOutcome::Completed(self.run_locked().await),
            Err(_) => {
                debug!("Sync already in flight, skipping tick");
                metrics::record_tick_skipped();
                TickOutcome::Skipped
            }
        }
    }

    #[tracing::instrument(skip(self), fields(domain_prefix = %self.config.domain_prefix))]
    async fn run_locked(&self) -> SyncOutcome {
        let first = match self.check_preconditions() {
            Ok(()) => self.attempt().await,
            Err(e) => Attempt {
                report: None,
                error: Some(e),
            },
        };

        let Some(error) = first.error.clone() else {
            metrics::record_sync_attempt("success");
            return SyncOutcome {
                report: first.report,
                error: None,
                retried: false,
            };
        };

        warn!(error = %error, "Sync attempt failed");
        if !self.handler.handle_failure(&error).await {
            let label = match error {
                SyncError::RemoteUnavailable { .. } => "unavailable",
                _ => "failed",
            };
            metrics::record_sync_attempt(label);
            return SyncOutcome {
                report: first.report,
                error: Some(error),
                retried: false,
            };
        }

        info!("Failure handler requested a retry");
        let second = self.attempt().await;
        match second.error {
            None => {
                info!("Retry succeeded");
                metrics::record_sync_attempt("retried_success");
            }
            Some(ref e) => {
                warn!(error = %e, "Retry failed, waiting for next tick");
                metrics::record_sync_attempt("retried_failed");
            }
        }

        SyncOutcome {
            report: second.report,
            error: second.error,
            retried: true,
        }
    }

    fn check_preconditions(&self) -> Result<(), SyncError> {
        if !self.connectivity.background_data_allowed() {
            return Err(SyncError::RemoteUnavailable {
                reason: "background data disabled".to_string(),
            });
        }
        if !self.connectivity.has_active_network() {
            return Err(SyncError::RemoteUnavailable {
                reason: "no active network".to_string(),
            });
        }
        Ok(())
    }

    async fn acquire_client(&self) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        let _timer = LatencyTimer::new("client");
        let result = match tokio::time::timeout(self.config.remote_timeout(), self.clients.client()).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        };

        let status = match result {
            Ok(_) => "success",
            Err(RemoteError::Timeout) => "timeout",
            Err(_) => "error",
        };
        metrics::record_remote_call("client", status);
        result
    }

    async fn attempt(&self) -> Attempt {
        let client = match self.acquire_client().await {
            Ok(client) => client,
            Err(e) => {
                return Attempt {
                    report: None,
                    error: Some(SyncError::Client(e)),
                }
            }
        };

        let adapter = RemoteAdapter::from_config(client, &self.config);
        let report = self.engine.run(&adapter).await;
        let error = report.first_error().cloned();
        Attempt {
            report: Some(report),
            error,
        }
    }
}
