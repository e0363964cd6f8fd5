use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trafego_provider::RecordKind;

/// Per-hostname knobs applied by the aggregator on top of whatever the
/// sources report: record type, content, TTL, proxy flag, and provider
/// routing can each be pinned for a single hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostnameOverride {
    /// Canonical hostname this override applies to.
    pub hostname: String,
    /// Replace the record type (requires `content` as well).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_kind: Option<RecordKind>,
    /// Replace the record content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Replace the TTL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Replace the proxy flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    /// Route to a specific provider instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Inactive overrides are kept but not applied.
    pub enabled: bool,
    /// Operator-facing note on why the override exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HostnameOverride {
    #[must_use]
    pub fn new(hostname: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            hostname: hostname.into(),
            record_kind: None,
            content: None,
            ttl: None,
            proxied: None,
            provider_id: None,
            enabled: true,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}
