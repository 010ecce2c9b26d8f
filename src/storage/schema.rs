// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Row encoding for the local store.
//!
//! Every table shares `id INTEGER PRIMARY KEY` and `timestamp TEXT UNIQUE`
//! (zero-padded, so `ORDER BY timestamp` is numeric order). The remaining
//! payload columns come from the record's [`LocalRecord`] impl.

use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Row};

use crate::codec::{decode_integer, encode_count};
use crate::record::{CallRecord, CallType, Location, RecordKind, UsageRecord};

pub type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Encode/decode capability for a record kind stored in the local cache.
pub trait LocalRecord: Sized + Send + Sync + Unpin + 'static {
    const KIND: RecordKind;

    /// Payload columns (name, SQLite type), in bind order.
    const COLUMNS: &'static [(&'static str, &'static str)];

    fn timestamp(&self) -> u64;

    /// Bind payload values in `COLUMNS` order.
    fn bind_payload<'q>(&self, query: AnyQuery<'q>) -> AnyQuery<'q>;

    /// Rebuild a record from a row selected as `timestamp, COLUMNS...`.
    fn from_row(row: &AnyRow) -> Result<Self, String>;
}

pub(crate) fn column_list<R: LocalRecord>() -> String {
    R::COLUMNS.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ")
}

pub(crate) fn create_table_sql<R: LocalRecord>(table: &str) -> String {
    let payload: Vec<String> = R::COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
            id INTEGER PRIMARY KEY, \
            timestamp TEXT NOT NULL UNIQUE, \
            {}\
        )",
        table,
        payload.join(", ")
    )
}

fn text(row: &AnyRow, column: &str) -> Result<String, String> {
    row.try_get::<String, _>(column)
        .map_err(|e| format!("{}: {}", column, e))
}

fn padded(row: &AnyRow, column: &str) -> Result<u64, String> {
    decode_integer(&text(row, column)?).map_err(|e| format!("{}: {}", column, e))
}

fn location(row: &AnyRow) -> Result<Location, String> {
    let lat: f64 = row.try_get("lat").map_err(|e| format!("lat: {}", e))?;
    let lon: f64 = row.try_get("lon").map_err(|e| format!("lon: {}", e))?;
    Location::new(lat, lon).map_err(|e| e.to_string())
}

impl LocalRecord for CallRecord {
    const KIND: RecordKind = RecordKind::Call;
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("number", "TEXT NOT NULL"),
        ("type", "INTEGER NOT NULL"),
        ("duration", "TEXT NOT NULL"),
        ("lat", "REAL NOT NULL"),
        ("lon", "REAL NOT NULL"),
    ];

    fn timestamp(&self) -> u64 {
        CallRecord::timestamp(self)
    }

    fn bind_payload<'q>(&self, query: AnyQuery<'q>) -> AnyQuery<'q> {
        query
            .bind(self.phone_number().to_string())
            .bind(self.call_type().code())
            .bind(encode_count(self.duration_secs()))
            .bind(self.location().latitude())
            .bind(self.location().longitude())
    }

    fn from_row(row: &AnyRow) -> Result<Self, String> {
        let code: i64 = row.try_get("type").map_err(|e| format!("type: {}", e))?;
        Ok(CallRecord::new(
            padded(row, "timestamp")?,
            text(row, "number")?,
            CallType::from_code(code).map_err(|e| e.to_string())?,
            padded(row, "duration")?,
            location(row)?,
        ))
    }
}

impl LocalRecord for UsageRecord {
    const KIND: RecordKind = RecordKind::Usage;
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("timeframe", "TEXT"),
        ("updata", "TEXT NOT NULL"),
        ("downdata", "TEXT NOT NULL"),
        ("lat", "REAL NOT NULL"),
        ("lon", "REAL NOT NULL"),
    ];

    fn timestamp(&self) -> u64 {
        UsageRecord::timestamp(self)
    }

    fn bind_payload<'q>(&self, query: AnyQuery<'q>) -> AnyQuery<'q> {
        query
            .bind(self.timeframe().map(encode_count))
            .bind(encode_count(self.bytes_up()))
            .bind(encode_count(self.bytes_down()))
            .bind(self.location().latitude())
            .bind(self.location().longitude())
    }

    fn from_row(row: &AnyRow) -> Result<Self, String> {
        let timeframe: Option<String> = row
            .try_get("timeframe")
            .map_err(|e| format!("timeframe: {}", e))?;
        let timeframe = match timeframe {
            Some(s) => Some(decode_integer(&s).map_err(|e| format!("timeframe: {}", e))?),
            None => None,
        };
        Ok(UsageRecord::from_parts(
            padded(row, "timestamp")?,
            timeframe,
            padded(row, "updata")?,
            padded(row, "downdata")?,
            location(row)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql::<CallRecord>("call_data");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS call_data ("));
        assert!(sql.contains("timestamp TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("number TEXT NOT NULL"));
        assert!(sql.ends_with("lon REAL NOT NULL)"));
    }

    #[test]
    fn test_column_list() {
        assert_eq!(column_list::<UsageRecord>(), "timeframe, updata, downdata, lat, lon");
    }
}
