//! Cloudflare API wire types.

use serde::Deserialize;

/// Standard Cloudflare v4 response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareResponse<T> {
    pub success: bool,
    pub errors: Option<Vec<CloudflareApiError>>,
    pub result: Option<T>,
    pub result_info: Option<CloudflareResultInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareApiError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareResultInfo {
    pub total_count: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareZone {
    pub id: String,
    #[allow(dead_code)]
    pub name: String,
}

/// A DNS record as returned by the Cloudflare API.
///
/// SRV and CAA records carry their structured fields in `data`; the
/// scalar types use `content`.
#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareDnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub ttl: u32,
    pub proxied: Option<bool>,
    pub comment: Option<String>,
    pub priority: Option<u16>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareSrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareCaaData {
    pub flags: u8,
    pub tag: String,
    pub value: String,
}
