// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Record <-> attribute mapping.
//!
//! | Call       | Usage       | Encoding                  |
//! |------------|-------------|---------------------------|
//! | `timestamp`| `timestamp` | 20-digit padded           |
//! | `number`   | `timeframe` | verbatim / 20-digit (opt) |
//! | `type`     | `updata`    | code / 20-digit           |
//! | `duration` | `downdata`  | 20-digit padded           |
//! | `lat`      | `lat`       | offset latitude           |
//! | `long`     | `long`      | offset longitude          |
//!
//! The item name is always the padded timestamp.

use crate::codec::{
    decode_integer, decode_latitude, decode_longitude, encode_count, encode_latitude,
    encode_longitude, encode_timestamp,
};
use crate::record::{CallRecord, CallType, Location, UsageRecord};

use super::traits::{Attribute, RemoteError};

/// Encoding of a record kind as a remote item.
pub trait RemoteRecord: Sized + Send + Sync {
    fn timestamp(&self) -> u64;

    fn item_name(&self) -> String {
        encode_timestamp(RemoteRecord::timestamp(self))
    }

    fn to_attributes(&self) -> Vec<Attribute>;

    fn from_attributes(item_name: &str, attributes: &[Attribute]) -> Result<Self, RemoteError>;
}

struct ItemReader<'a> {
    item: &'a str,
    attributes: &'a [Attribute],
}

impl<'a> ItemReader<'a> {
    fn new(item: &'a str, attributes: &'a [Attribute]) -> Self {
        Self { item, attributes }
    }

    fn malformed(&self, reason: impl Into<String>) -> RemoteError {
        RemoteError::Malformed {
            item: self.item.to_string(),
            reason: reason.into(),
        }
    }

    fn optional(&self, name: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    fn required(&self, name: &str) -> Result<&'a str, RemoteError> {
        self.optional(name)
            .ok_or_else(|| self.malformed(format!("missing attribute '{}'", name)))
    }

    fn integer(&self, name: &str) -> Result<u64, RemoteError> {
        decode_integer(self.required(name)?).map_err(|e| self.malformed(format!("{}: {}", name, e)))
    }

    fn location(&self) -> Result<Location, RemoteError> {
        let lat = decode_latitude(self.required("lat")?).map_err(|e| self.malformed(format!("lat: {}", e)))?;
        let lon = decode_longitude(self.required("long")?).map_err(|e| self.malformed(format!("long: {}", e)))?;
        Location::new(lat, lon).map_err(|e| self.malformed(e.to_string()))
    }
}

fn location_attributes(location: Location, out: &mut Vec<Attribute>) {
    out.push(Attribute::new("lat", encode_latitude(location.latitude())));
    out.push(Attribute::new("long", encode_longitude(location.longitude())));
}

impl RemoteRecord for CallRecord {
    fn timestamp(&self) -> u64 {
        CallRecord::timestamp(self)
    }

    fn to_attributes(&self) -> Vec<Attribute> {
        let mut attrs = vec![
            Attribute::new("timestamp", encode_timestamp(self.timestamp())),
            Attribute::new("number", self.phone_number()),
            Attribute::new("type", self.call_type().code().to_string()),
            Attribute::new("duration", encode_count(self.duration_secs())),
        ];
        location_attributes(self.location(), &mut attrs);
        attrs
    }

    fn from_attributes(item_name: &str, attributes: &[Attribute]) -> Result<Self, RemoteError> {
        let reader = ItemReader::new(item_name, attributes);
        let code: i64 = reader
            .required("type")?
            .parse()
            .map_err(|_| reader.malformed("type is not a number"))?;
        let call_type = CallType::from_code(code).map_err(|e| reader.malformed(e.to_string()))?;

        Ok(CallRecord::new(
            reader.integer("timestamp")?,
            reader.required("number")?,
            call_type,
            reader.integer("duration")?,
            reader.location()?,
        ))
    }
}

impl RemoteRecord for UsageRecord {
    fn timestamp(&self) -> u64 {
        UsageRecord::timestamp(self)
    }

    fn to_attributes(&self) -> Vec<Attribute> {
        let mut attrs = vec![Attribute::new("timestamp", encode_timestamp(self.timestamp()))];
        if let Some(timeframe) = self.timeframe() {
            attrs.push(Attribute::new("timeframe", encode_timestamp(timeframe)));
        }
        attrs.push(Attribute::new("updata", encode_count(self.bytes_up())));
        attrs.push(Attribute::new("downdata", encode_count(self.bytes_down())));
        location_attributes(self.location(), &mut attrs);
        attrs
    }

    fn from_attributes(item_name: &str, attributes: &[Attribute]) -> Result<Self, RemoteError> {
        let reader = ItemReader::new(item_name, attributes);
        let timeframe = match reader.optional("timeframe") {
            Some(_) => Some(reader.integer("timeframe")?),
            None => None,
        };

        Ok(UsageRecord::from_parts(
            reader.integer("timestamp")?,
            timeframe,
            reader.integer("updata")?,
            reader.integer("downdata")?,
            reader.location()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
        attrs.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }

    #[test]
    fn test_call_attributes() {
        let call = CallRecord::new(1000, "555-1234", CallType::Outgoing, 42, Location::UNKNOWN);
        let attrs = call.to_attributes();

        assert_eq!(call.item_name(), "00000000000000001000");
        assert_eq!(value(&attrs, "timestamp"), Some("00000000000000001000"));
        assert_eq!(value(&attrs, "number"), Some("555-1234"));
        assert_eq!(value(&attrs, "type"), Some("2"));
        assert_eq!(value(&attrs, "duration"), Some("00000000000000000042"));
        assert_eq!(value(&attrs, "lat"), Some("090.000000"));
        assert_eq!(value(&attrs, "long"), Some("0000000000180.000000"));

        let decoded = CallRecord::from_attributes(&call.item_name(), &attrs).unwrap();
        assert_eq!(decoded, call);
    }

    #[test]
    fn test_usage_timeframe_only_when_present() {
        let cumulative = UsageRecord::new(5, 100, 200, Location::UNKNOWN);
        assert!(value(&cumulative.to_attributes(), "timeframe").is_none());

        let delta = UsageRecord::with_timeframe(5, 3, 10, 20, Location::new(-33.8688, 151.2093).unwrap());
        let attrs = delta.to_attributes();
        assert_eq!(value(&attrs, "timeframe"), Some("00000000000000000003"));
        assert_eq!(value(&attrs, "updata"), Some("00000000000000000010"));

        let decoded = UsageRecord::from_attributes(&delta.item_name(), &attrs).unwrap();
        assert_eq!(decoded.timeframe(), Some(3));
        assert!((decoded.location().latitude() - -33.8688).abs() < 1e-6);
    }

    #[test]
    fn test_missing_attribute_is_malformed() {
        let attrs = vec![Attribute::new("timestamp", encode_timestamp(1))];
        let err = UsageRecord::from_attributes("x", &attrs).unwrap_err();
        assert!(matches!(err, RemoteError::Malformed { ref item, .. } if item == "x"));
    }

    #[test]
    fn test_bad_padding_is_malformed() {
        let call = CallRecord::new(1, "1", CallType::Missed, 0, Location::UNKNOWN);
        let mut attrs = call.to_attributes();
        attrs[0].value = "12abc".into();
        assert!(matches!(
            CallRecord::from_attributes("1", &attrs),
            Err(RemoteError::Malformed { .. })
        ));
    }
}
