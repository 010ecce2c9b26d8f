// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Order-preserving string encodings for the remote store.
//!
//! The remote store compares attribute values as strings only, so every
//! numeric field is written fixed-width and left-zero-padded. For any two
//! values `a < b`, `encode(a) <= encode(b)` lexicographically.
//!
//! | Field                       | Width | Scheme                          |
//! |-----------------------------|-------|---------------------------------|
//! | timestamp / timeframe       | 20    | zero-padded integer             |
//! | duration / byte counts      | 20    | zero-padded integer             |
//! | latitude                    | 10    | `lat + 90`, 6 decimals, padded  |
//! | longitude                   | 20    | `lon + 180`, 6 decimals, padded |
//!
//! Coordinates are offset so that negative values sort below positive ones
//! without a sign character.
//!
//! ```
//! use telemetry_sync::codec::{encode_timestamp, encode_latitude};
//!
//! assert_eq!(encode_timestamp(1000), "00000000000000001000");
//! assert!(encode_timestamp(999) < encode_timestamp(1000));
//! assert!(encode_latitude(-12.5) < encode_latitude(3.0));
//! ```

use thiserror::Error;

pub const TIMESTAMP_WIDTH: usize = 20;
pub const COUNT_WIDTH: usize = 20;
pub const LATITUDE_WIDTH: usize = 10;
pub const LONGITUDE_WIDTH: usize = 20;

const LATITUDE_OFFSET: f64 = 90.0;
const LONGITUDE_OFFSET: f64 = 180.0;
const COORDINATE_DECIMALS: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("'{0}' is not a zero-padded integer")]
    Integer(String),
    #[error("'{0}' is not a padded coordinate")]
    Coordinate(String),
    #[error("decoded coordinate {0} is out of range")]
    OutOfRange(f64),
}

/// Left-pad `value` with zeros to `width` digits.
///
/// `u64::MAX` has 20 digits, so widths of 20 never truncate.
#[must_use]
pub fn pad_integer(value: u64, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

#[must_use]
pub fn encode_timestamp(timestamp: u64) -> String {
    pad_integer(timestamp, TIMESTAMP_WIDTH)
}

#[must_use]
pub fn encode_count(count: u64) -> String {
    pad_integer(count, COUNT_WIDTH)
}

/// Parse a zero-padded integer. Only ASCII digits are accepted.
pub fn decode_integer(encoded: &str) -> Result<u64, CodecError> {
    if encoded.is_empty() || !encoded.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::Integer(encoded.to_string()));
    }
    encoded
        .parse::<u64>()
        .map_err(|_| CodecError::Integer(encoded.to_string()))
}

/// Callers pass validated coordinates; anything below `-offset` would
/// gain a sign character and break ordering.
fn encode_offset(value: f64, offset: f64, width: usize) -> String {
    let shifted = value + offset;
    debug_assert!(
        (0.0..=2.0 * offset).contains(&shifted),
        "coordinate {} outside +/-{}",
        value,
        offset
    );
    format!("{:0width$.prec$}", shifted, width = width, prec = COORDINATE_DECIMALS)
}

fn decode_offset(encoded: &str, offset: f64, bound: f64) -> Result<f64, CodecError> {
    let well_formed = !encoded.is_empty()
        && encoded.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    if !well_formed {
        return Err(CodecError::Coordinate(encoded.to_string()));
    }
    let shifted: f64 = encoded
        .parse()
        .map_err(|_| CodecError::Coordinate(encoded.to_string()))?;
    let value = shifted - offset;
    if value < -bound || value > bound {
        return Err(CodecError::OutOfRange(value));
    }
    Ok(value)
}

#[must_use]
pub fn encode_latitude(latitude: f64) -> String {
    encode_offset(latitude, LATITUDE_OFFSET, LATITUDE_WIDTH)
}

pub fn decode_latitude(encoded: &str) -> Result<f64, CodecError> {
    decode_offset(encoded, LATITUDE_OFFSET, 90.0)
}

#[must_use]
pub fn encode_longitude(longitude: f64) -> String {
    encode_offset(longitude, LONGITUDE_OFFSET, LONGITUDE_WIDTH)
}

pub fn decode_longitude(encoded: &str) -> Result<f64, CodecError> {
    decode_offset(encoded, LONGITUDE_OFFSET, 180.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_width_and_order() {
        let t = encode_timestamp(1000);
        assert_eq!(t.len(), TIMESTAMP_WIDTH);
        assert_eq!(t, "00000000000000001000");
        assert!(encode_timestamp(9) < encode_timestamp(10));
        assert_eq!(encode_timestamp(u64::MAX).len(), TIMESTAMP_WIDTH);
    }

    #[test]
    fn test_decode_integer() {
        assert_eq!(decode_integer("00000000000000000042").unwrap(), 42);
        assert!(decode_integer("").is_err());
        assert!(decode_integer("-0001").is_err());
        assert!(decode_integer("12a4").is_err());
    }

    #[test]
    fn test_latitude_encoding() {
        assert_eq!(encode_latitude(0.0), "090.000000");
        assert_eq!(encode_latitude(-90.0), "000.000000");
        assert_eq!(encode_latitude(90.0), "180.000000");
        assert_eq!(encode_latitude(-33.8688).len(), LATITUDE_WIDTH);

        let decoded = decode_latitude(&encode_latitude(-33.8688)).unwrap();
        assert!((decoded - -33.8688).abs() < 1e-6);
    }

    #[test]
    fn test_longitude_encoding() {
        assert_eq!(encode_longitude(0.0), "0000000000180.000000");
        assert_eq!(encode_longitude(151.2093).len(), LONGITUDE_WIDTH);
        assert!(encode_longitude(-122.4) < encode_longitude(-0.1));

        let decoded = decode_longitude(&encode_longitude(151.2093)).unwrap();
        assert!((decoded - 151.2093).abs() < 1e-6);
    }

    #[test]
    fn test_decode_coordinate_rejects_garbage() {
        assert!(matches!(decode_latitude("-12.5"), Err(CodecError::Coordinate(_))));
        assert!(matches!(decode_latitude("abc"), Err(CodecError::Coordinate(_))));
        assert!(matches!(decode_latitude("200.000000"), Err(CodecError::OutOfRange(_))));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside")]
    fn test_out_of_range_latitude_is_not_clamped() {
        let _ = encode_latitude(-91.0);
    }
}
