// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the telemetry cache and sync controller.
//!
//! # Example
//!
//! ```
//! use telemetry_sync::SyncConfig;
//! use std::time::Duration;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.domain_prefix, "user");
//! assert_eq!(config.sync_interval(), Duration::from_secs(3600));
//!
//! // Full config
//! let config = SyncConfig {
//!     database_path: "/data/telemetry.db".into(),
//!     domain_prefix: "device42".into(),
//!     remote_timeout_ms: 10_000,
//!     ..Default::default()
//! };
//! assert_eq!(config.sqlite_url(), "sqlite:///data/telemetry.db?mode=rwc");
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Configuration for the cache and sync layer.
///
/// All fields have defaults. Hosts usually set `database_path` and
/// `domain_prefix` (one prefix per user or device).
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Path to the local SQLite cache file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Prefix for remote domain names (`{prefix}_call`, `{prefix}_mobile`, `{prefix}_wifi`)
    #[serde(default = "default_domain_prefix")]
    pub domain_prefix: String,

    /// Cadence for the schedule driver (default: hourly)
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Timeout applied to every remote call
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,

    /// Rows fetched per page by `LocalStore::list_range`
    #[serde(default = "default_local_page_size")]
    pub local_page_size: usize,

    /// SQLite pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String { "./telemetry_cache.db".to_string() }
fn default_domain_prefix() -> String { "user".to_string() }
fn default_sync_interval_secs() -> u64 { 60 * 60 }
fn default_remote_timeout_ms() -> u64 { 30_000 }
fn default_local_page_size() -> usize { 500 }
fn default_max_connections() -> u32 { 4 }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            domain_prefix: default_domain_prefix(),
            sync_interval_secs: default_sync_interval_secs(),
            remote_timeout_ms: default_remote_timeout_ms(),
            local_page_size: default_local_page_size(),
            max_connections: default_max_connections(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// Connection string for the sqlx `Any` driver (creates the file if missing).
    #[must_use]
    pub fn sqlite_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.database_path)
    }
}
