//! DigitalOcean API wire types.

use serde::{Deserialize, Serialize};

/// A domain record as stored by DigitalOcean.
///
/// Record names are zone-relative (`"@"` for the apex); hostname-valued
/// data fields (CNAME targets, MX exchanges, …) are absolute with a
/// trailing dot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DoDomainRecord {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub data: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DoRecordList {
    pub domain_records: Vec<DoDomainRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DoSingleRecord {
    pub domain_record: DoDomainRecord,
}

/// DigitalOcean error envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DoErrorBody {
    pub id: Option<String>,
    pub message: Option<String>,
}

/// Request body for record creation and update.
#[derive(Debug, Serialize)]
pub(crate) struct DoRecordBody<'a> {
    #[serde(rename = "type")]
    pub record_type: &'a str,
    pub name: String,
    pub data: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<&'a str>,
}
