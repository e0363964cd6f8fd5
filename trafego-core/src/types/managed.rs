use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trafego_provider::{fingerprint, Record, RecordKey};

/// How a record entered the managed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    /// The engine created it.
    Managed,
    /// Observed at the provider; the engine does not own it.
    Discovered,
    /// Claimed from the provider (conflict resolution, marker
    /// self-healing, or an operator claim).
    Imported,
}

impl RecordSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::Discovered => "discovered",
            Self::Imported => "imported",
        }
    }
}

impl std::str::FromStr for RecordSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "managed" => Ok(Self::Managed),
            "discovered" => Ok(Self::Discovered),
            "imported" => Ok(Self::Imported),
            other => Err(format!("unknown record source '{other}'")),
        }
    }
}

/// A record the engine tracks: ownership metadata around a canonical
/// record it has created, claimed, or discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedRecord {
    /// Engine-assigned provider instance id.
    pub provider_id: String,
    /// Provider-native record id.
    pub external_id: String,
    /// Canonical record content as last written/observed.
    pub record: Record,
    /// Content fingerprint of `record`.
    pub fingerprint: String,
    /// How this row entered the store.
    pub source: RecordSource,
    /// Whether the engine considers itself authoritative for the record.
    /// Records with `managed = false` are never mutated.
    pub managed: bool,
    /// Set once the record has dropped out of the desired state.
    pub is_orphaned: bool,
    /// When orphan state was entered, if it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphaned_at: Option<DateTime<Utc>>,
    /// First time the engine saw this record anywhere.
    pub first_seen_at: DateTime<Utc>,
    /// When the row was added to the managed store.
    pub tracked_at: DateTime<Utc>,
    /// Last content mutation.
    pub updated_at: DateTime<Utc>,
    /// Opaque key/value annotations.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ManagedRecord {
    /// Build a fresh managed row for a record at `now`.
    #[must_use]
    pub fn track_new(
        provider_id: impl Into<String>,
        external_id: impl Into<String>,
        record: Record,
        source: RecordSource,
        managed: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let fp = fingerprint(&record);
        Self {
            provider_id: provider_id.into(),
            external_id: external_id.into(),
            record,
            fingerprint: fp,
            source,
            managed,
            is_orphaned: false,
            orphaned_at: None,
            first_seen_at: now,
            tracked_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> RecordKey {
        self.record.key()
    }
}
