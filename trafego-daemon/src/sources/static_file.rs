//! Static file hostname source.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use trafego_core::traits::HostnameSource;
use trafego_core::types::DesiredRecord;
use trafego_core::{EngineError, EngineResult};
use trafego_provider::{Record, RecordData, RecordKind};

/// One entry of the static desired-records file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    hostname: String,
    #[serde(rename = "type")]
    kind: RecordKind,
    content: String,
    #[serde(default)]
    ttl: u32,
    #[serde(default)]
    proxied: Option<bool>,
    #[serde(default)]
    provider_id: Option<String>,
}

/// Reads a JSON array of desired records from disk on every snapshot,
/// so edits take effect on the next reconciliation without a restart.
pub struct StaticFileSource {
    path: PathBuf,
}

impl StaticFileSource {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn entry_to_record(entry: FileEntry) -> Option<DesiredRecord> {
        let data = match entry.kind {
            RecordKind::A => RecordData::A {
                address: entry.content,
            },
            RecordKind::Aaaa => RecordData::AAAA {
                address: entry.content,
            },
            RecordKind::Cname => RecordData::CNAME {
                target: entry.content,
            },
            RecordKind::Txt => RecordData::TXT {
                text: entry.content,
            },
            RecordKind::Ns => RecordData::NS {
                nameserver: entry.content,
            },
            other => {
                log::warn!(
                    "static source: '{}' uses record type {other} which needs structured fields; skipping",
                    entry.hostname
                );
                return None;
            }
        };

        let mut record = Record::new(entry.hostname, entry.ttl, data);
        record.proxied = entry.proxied;
        Some(DesiredRecord {
            record,
            provider_id: entry.provider_id,
        })
    }
}

#[async_trait]
impl HostnameSource for StaticFileSource {
    fn name(&self) -> &str {
        "static-file"
    }

    async fn snapshot(&self) -> EngineResult<Vec<DesiredRecord>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            EngineError::ValidationError(format!(
                "static source: cannot read {}: {e}",
                self.path.display()
            ))
        })?;

        let entries: Vec<FileEntry> = serde_json::from_str(&raw).map_err(|e| {
            EngineError::SerializationError(format!(
                "static source: cannot parse {}: {e}",
                self.path.display()
            ))
        })?;

        Ok(entries
            .into_iter()
            .filter_map(Self::entry_to_record)
            .collect())
    }
}
