//! Row-level encoding helpers shared by the repository implementations.

use chrono::{DateTime, Utc};

use trafego_core::error::{EngineError, EngineResult};
use trafego_provider::{Record, RecordData};

pub(crate) fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339()
}

pub(crate) fn decode_time(s: &str, column: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::SerializationError(format!("Invalid {column}: {e}")))
}

pub(crate) fn decode_time_opt(
    s: Option<&str>,
    column: &str,
) -> EngineResult<Option<DateTime<Utc>>> {
    s.map(|v| decode_time(v, column)).transpose()
}

pub(crate) fn encode_data(data: &RecordData) -> EngineResult<String> {
    serde_json::to_string(data).map_err(|e| EngineError::SerializationError(e.to_string()))
}

pub(crate) fn decode_data(json: &str) -> EngineResult<RecordData> {
    serde_json::from_str(json)
        .map_err(|e| EngineError::SerializationError(format!("Invalid record data JSON: {e}")))
}

pub(crate) fn encode_proxied(proxied: Option<bool>) -> Option<i32> {
    proxied.map(i32::from)
}

pub(crate) fn decode_proxied(proxied: Option<i32>) -> Option<bool> {
    proxied.map(|v| v != 0)
}

/// Rebuild a canonical [`Record`] from its row columns.
pub(crate) fn decode_record(
    name: String,
    ttl: i64,
    data_json: &str,
    proxied: Option<i32>,
    comment: Option<String>,
) -> EngineResult<Record> {
    Ok(Record {
        name,
        ttl: u32::try_from(ttl)
            .map_err(|_| EngineError::SerializationError(format!("Invalid TTL: {ttl}")))?,
        data: decode_data(data_json)?,
        proxied: decode_proxied(proxied),
        comment,
    })
}

pub(crate) fn storage_err(context: &str, e: sea_orm::DbErr) -> EngineError {
    EngineError::StorageError(format!("{context}: {e}"))
}
