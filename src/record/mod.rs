// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Record model: the value types that flow from event sources to the remote store.
//!
//! Both record kinds are keyed by their creation timestamp (epoch millis).
//! Callers must keep timestamps distinct within a collection; device-clock
//! milliseconds are sufficient in practice.

mod call;
mod usage;

pub use call::{CallRecord, CallType};
pub use usage::UsageRecord;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid field values rejected at construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),
    #[error("unknown call type code {0}")]
    CallType(i64),
}

/// Current device time in epoch millis.
#[must_use]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Position attached to a record at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LocationRepr")]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct LocationRepr {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<LocationRepr> for Location {
    type Error = RecordError;

    fn try_from(repr: LocationRepr) -> Result<Self, Self::Error> {
        Location::new(repr.latitude, repr.longitude)
    }
}

impl Location {
    /// Used when no location fix is available.
    pub const UNKNOWN: Location = Location { latitude: 0.0, longitude: 0.0 };

    /// Validated constructor. NaN and infinities are out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, RecordError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RecordError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(RecordError::Longitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// The shape of a record, used to check a record against its target collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Call,
    Usage,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Usage => write!(f, "usage"),
        }
    }
}

/// A named partition, present both locally (a table) and remotely (a domain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Calls,
    CellularUsage,
    WifiUsage,
}

impl Collection {
    /// Drain order used by the sync engine.
    pub const ALL: [Collection; 3] = [Self::Calls, Self::CellularUsage, Self::WifiUsage];

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Calls => RecordKind::Call,
            Self::CellularUsage | Self::WifiUsage => RecordKind::Usage,
        }
    }

    /// Local SQLite table.
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Calls => "call_data",
            Self::CellularUsage => "mobile_data",
            Self::WifiUsage => "wifi_data",
        }
    }

    /// Appended to the configured prefix to form the remote domain name.
    #[must_use]
    pub fn domain_suffix(&self) -> &'static str {
        match self {
            Self::Calls => "_call",
            Self::CellularUsage => "_mobile",
            Self::WifiUsage => "_wifi",
        }
    }

    #[must_use]
    pub fn domain_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.domain_suffix())
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calls => write!(f, "calls"),
            Self::CellularUsage => write!(f, "cellular_usage"),
            Self::WifiUsage => write!(f, "wifi_usage"),
        }
    }
}
