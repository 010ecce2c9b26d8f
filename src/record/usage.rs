// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use super::Location;

/// A network data-usage sample for one channel (cellular or Wi-Fi).
///
/// Without a `timeframe` the byte counts are cumulative since device boot.
/// With a `timeframe` they are the delta since the reading taken at that
/// timestamp. Sync never branches on the distinction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeframe: Option<u64>,
    bytes_up: u64,
    bytes_down: u64,
    location: Location,
}

impl UsageRecord {
    /// A cumulative sample.
    pub fn new(timestamp: u64, bytes_up: u64, bytes_down: u64, location: Location) -> Self {
        Self {
            timestamp,
            timeframe: None,
            bytes_up,
            bytes_down,
            location,
        }
    }

    /// A sample relative to the reading taken at `timeframe`.
    pub fn with_timeframe(
        timestamp: u64,
        timeframe: u64,
        bytes_up: u64,
        bytes_down: u64,
        location: Location,
    ) -> Self {
        Self {
            timeframe: Some(timeframe),
            ..Self::new(timestamp, bytes_up, bytes_down, location)
        }
    }

    pub(crate) fn from_parts(
        timestamp: u64,
        timeframe: Option<u64>,
        bytes_up: u64,
        bytes_down: u64,
        location: Location,
    ) -> Self {
        Self { timestamp, timeframe, bytes_up, bytes_down, location }
    }

    /// Delta between two cumulative readings of the same channel.
    ///
    /// Counters reset when the device reboots; a counter lower than the
    /// previous reading is taken as the full amount since the reset.
    #[must_use]
    pub fn delta_since(&self, previous: &UsageRecord) -> UsageRecord {
        fn diff(current: u64, previous: u64) -> u64 {
            if current >= previous { current - previous } else { current }
        }

        UsageRecord::with_timeframe(
            self.timestamp,
            previous.timestamp,
            diff(self.bytes_up, previous.bytes_up),
            diff(self.bytes_down, previous.bytes_down),
            self.location,
        )
    }

    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[must_use]
    pub fn timeframe(&self) -> Option<u64> {
        self.timeframe
    }

    #[must_use]
    pub fn is_delta(&self) -> bool {
        self.timeframe.is_some()
    }

    #[must_use]
    pub fn bytes_up(&self) -> u64 {
        self.bytes_up
    }

    #[must_use]
    pub fn bytes_down(&self) -> u64 {
        self.bytes_down
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_since() {
        let first = UsageRecord::new(1_000, 500, 9_000, Location::UNKNOWN);
        let second = UsageRecord::new(16_000, 800, 12_500, Location::UNKNOWN);

        let delta = second.delta_since(&first);
        assert_eq!(delta.timestamp(), 16_000);
        assert_eq!(delta.timeframe(), Some(1_000));
        assert_eq!(delta.bytes_up(), 300);
        assert_eq!(delta.bytes_down(), 3_500);
        assert!(delta.is_delta());
    }

    #[test]
    fn test_delta_after_counter_reset() {
        let before_reboot = UsageRecord::new(1_000, 50_000, 90_000, Location::UNKNOWN);
        let after_reboot = UsageRecord::new(2_000, 120, 4_000, Location::UNKNOWN);

        let delta = after_reboot.delta_since(&before_reboot);
        assert_eq!(delta.bytes_up(), 120);
        assert_eq!(delta.bytes_down(), 4_000);
    }

    #[test]
    fn test_cumulative_has_no_timeframe() {
        let sample = UsageRecord::new(1, 2, 3, Location::UNKNOWN);
        assert!(!sample.is_delta());
        let json = serde_json::to_string(&sample).unwrap();
        assert!(!json.contains("timeframe"));
    }
}
