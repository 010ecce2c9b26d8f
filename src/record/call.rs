// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use super::{Location, RecordError};

/// Direction of a call. Codes follow the platform call-log convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    Incoming,
    Outgoing,
    Missed,
}

impl CallType {
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::Incoming => 1,
            Self::Outgoing => 2,
            Self::Missed => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, RecordError> {
        match code {
            1 => Ok(Self::Incoming),
            2 => Ok(Self::Outgoing),
            3 => Ok(Self::Missed),
            other => Err(RecordError::CallType(other)),
        }
    }
}

/// A phone call captured from the call log.
///
/// # Example
///
/// ```
/// use telemetry_sync::{CallRecord, CallType, Location};
///
/// let call = CallRecord::new(1000, "555-1234", CallType::Outgoing, 42, Location::UNKNOWN);
/// assert_eq!(call.timestamp(), 1000);
/// assert_eq!(call.call_type().code(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    timestamp: u64,
    phone_number: String,
    call_type: CallType,
    duration_secs: u64,
    location: Location,
}

impl CallRecord {
    pub fn new(
        timestamp: u64,
        phone_number: impl Into<String>,
        call_type: CallType,
        duration_secs: u64,
        location: Location,
    ) -> Self {
        Self {
            timestamp,
            phone_number: phone_number.into(),
            call_type,
            duration_secs,
            location,
        }
    }

    /// Creation key (epoch millis)
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[must_use]
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    #[must_use]
    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}
