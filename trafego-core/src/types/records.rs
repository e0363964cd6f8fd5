use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trafego_provider::{fingerprint, ProviderRecord, Record, RecordKey};

/// A record the engine believes should exist, as produced by the
/// hostname source aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredRecord {
    /// Canonical record content.
    #[serde(flatten)]
    pub record: Record,
    /// Routing hint: which provider instance should own this record.
    /// `None` routes to the default provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl DesiredRecord {
    #[must_use]
    pub fn new(record: Record) -> Self {
        Self {
            record,
            provider_id: None,
        }
    }

    #[must_use]
    pub fn with_provider(record: Record, provider_id: impl Into<String>) -> Self {
        Self {
            record,
            provider_id: Some(provider_id.into()),
        }
    }

    #[must_use]
    pub fn key(&self) -> RecordKey {
        self.record.key()
    }
}

/// A row of the provider cache: the engine's last-known view of one
/// record at a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRecord {
    /// Engine-assigned provider instance id.
    pub provider_id: String,
    /// Provider-native record id.
    pub external_id: String,
    /// Canonical record content.
    pub record: Record,
    /// Content fingerprint, precomputed so cross-cache diffs are O(1).
    pub fingerprint: String,
    /// When this row was last confirmed against the provider.
    pub last_refreshed_at: DateTime<Utc>,
}

impl CachedRecord {
    /// Build a cache row from a freshly listed provider record.
    #[must_use]
    pub fn from_listing(
        provider_id: impl Into<String>,
        listed: ProviderRecord,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        let fp = fingerprint(&listed.record);
        Self {
            provider_id: provider_id.into(),
            external_id: listed.external_id,
            record: listed.record,
            fingerprint: fp,
            last_refreshed_at: refreshed_at,
        }
    }

    #[must_use]
    pub fn key(&self) -> RecordKey {
        self.record.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trafego_provider::RecordData;

    #[test]
    fn cached_record_precomputes_fingerprint() {
        let listed = ProviderRecord::new(
            "ext-1",
            Record::new(
                "app.example.com",
                300,
                RecordData::A {
                    address: "1.2.3.4".to_string(),
                },
            ),
        );
        let row = CachedRecord::from_listing("prov-1", listed.clone(), Utc::now());
        assert_eq!(row.fingerprint, fingerprint(&listed.record));
        assert_eq!(row.external_id, "ext-1");
    }

    #[test]
    fn desired_record_key() {
        let d = DesiredRecord::new(Record::new(
            "app.example.com",
            300,
            RecordData::A {
                address: "1.2.3.4".to_string(),
            },
        ));
        assert_eq!(d.key().name, "app.example.com");
        assert!(d.provider_id.is_none());
    }
}
