//! Hostname source aggregation: merges snapshots from every configured
//! source into one deduplicated, canonicalized desired set per provider.

use std::collections::HashMap;
use std::sync::Arc;

use trafego_provider::{canonicalize, RecordData, RecordKey, RecordKind};

use crate::error::{EngineError, EngineResult};
use crate::traits::{HostnameSource, OverrideRepository};
use crate::types::{DesiredRecord, HostnameOverride};

/// A key excluded from the desired set because two sources disagreed on
/// its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDesired {
    pub provider_id: String,
    pub key: RecordKey,
    /// The conflicting contents, in observation order.
    pub values: Vec<String>,
}

/// The merged desired state for one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct DesiredSet {
    by_provider: HashMap<String, Vec<DesiredRecord>>,
    /// Keys excluded because sources conflicted; the reconciler proceeds
    /// with everything else.
    pub rejected: Vec<RejectedDesired>,
}

impl DesiredSet {
    /// Desired records routed to one provider.
    #[must_use]
    pub fn for_provider(&self, provider_id: &str) -> Vec<DesiredRecord> {
        self.by_provider.get(provider_id).cloned().unwrap_or_default()
    }

    /// Provider ids with at least one desired record.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<String> {
        self.by_provider.keys().cloned().collect()
    }

    #[must_use]
    pub fn total_records(&self) -> usize {
        self.by_provider.values().map(Vec::len).sum()
    }
}

/// Merges hostname-source snapshots into the final desired set.
pub struct HostnameAggregator {
    sources: Vec<Arc<dyn HostnameSource>>,
    overrides: Arc<dyn OverrideRepository>,
    /// Records with no provider hint route here.
    default_provider: Option<String>,
}

impl HostnameAggregator {
    #[must_use]
    pub fn new(
        sources: Vec<Arc<dyn HostnameSource>>,
        overrides: Arc<dyn OverrideRepository>,
        default_provider: Option<String>,
    ) -> Self {
        Self {
            sources,
            overrides,
            default_provider,
        }
    }

    /// Take a snapshot from every source and merge them.
    ///
    /// Individual invalid records are logged and skipped; a source
    /// failing outright aborts the pass (the engine retries next tick).
    pub async fn desired_set(&self) -> EngineResult<DesiredSet> {
        let overrides: HashMap<String, HostnameOverride> = self
            .overrides
            .list_enabled()
            .await?
            .into_iter()
            .map(|o| (o.hostname.clone(), o))
            .collect();

        let mut merged: HashMap<(String, RecordKey), DesiredRecord> = HashMap::new();
        let mut conflicts: HashMap<(String, RecordKey), Vec<String>> = HashMap::new();

        for source in &self.sources {
            let snapshot = source.snapshot().await?;
            log::debug!(
                "source '{}' reported {} desired record(s)",
                source.name(),
                snapshot.len()
            );

            for raw in snapshot {
                let mut desired = match canonicalize(raw.record.clone()) {
                    Ok(record) => DesiredRecord {
                        record,
                        provider_id: raw.provider_id,
                    },
                    Err(e) => {
                        log::warn!(
                            "source '{}': skipping invalid record '{}': {e}",
                            source.name(),
                            raw.record.name
                        );
                        continue;
                    }
                };

                if let Some(ov) = overrides.get(&desired.record.name) {
                    desired = apply_override(desired, ov);
                    // Override content is operator input: re-canonicalize.
                    match canonicalize(desired.record.clone()) {
                        Ok(record) => desired.record = record,
                        Err(e) => {
                            log::warn!(
                                "override for '{}' produced an invalid record: {e}; skipping",
                                desired.record.name
                            );
                            continue;
                        }
                    }
                }

                let Some(provider_id) = desired
                    .provider_id
                    .clone()
                    .or_else(|| self.default_provider.clone())
                else {
                    log::warn!(
                        "source '{}': no provider routing for '{}' and no default provider; skipping",
                        source.name(),
                        desired.record.name
                    );
                    continue;
                };

                let slot = (provider_id, desired.key());
                match merged.get(&slot) {
                    None => {
                        if let Some(values) = conflicts.get_mut(&slot) {
                            // Key already poisoned this pass.
                            let content = desired.record.content().to_string();
                            if !values.contains(&content) {
                                values.push(content);
                            }
                            continue;
                        }
                        merged.insert(slot, desired);
                    }
                    Some(existing) => {
                        if existing.record.content() == desired.record.content() {
                            // Identical duplicate across sources: no-op.
                            continue;
                        }
                        let err = EngineError::DuplicateDesired {
                            key: slot.1.clone(),
                            values: vec![
                                existing.record.content().to_string(),
                                desired.record.content().to_string(),
                            ],
                        };
                        log::warn!("excluding conflicted key from plan: {err}");
                        let removed = merged.remove(&slot);
                        let mut values = Vec::new();
                        if let Some(r) = removed {
                            values.push(r.record.content().to_string());
                        }
                        values.push(desired.record.content().to_string());
                        conflicts.insert(slot, values);
                    }
                }
            }
        }

        let mut set = DesiredSet::default();
        for ((provider_id, _), desired) in merged {
            set.by_provider.entry(provider_id).or_default().push(desired);
        }
        for records in set.by_provider.values_mut() {
            records.sort_by(|a, b| a.record.name.cmp(&b.record.name));
        }
        set.rejected = conflicts
            .into_iter()
            .map(|((provider_id, key), values)| RejectedDesired {
                provider_id,
                key,
                values,
            })
            .collect();

        Ok(set)
    }
}

/// Apply a hostname override to a desired record.
///
/// A type change requires replacement content; only scalar record types
/// can be built from a bare content string, so MX/SRV/CAA type changes
/// are ignored with a warning.
fn apply_override(mut desired: DesiredRecord, ov: &HostnameOverride) -> DesiredRecord {
    if let Some(kind) = ov.record_kind {
        match (kind, ov.content.clone()) {
            (RecordKind::A, Some(address)) => {
                desired.record.data = RecordData::A { address };
            }
            (RecordKind::Aaaa, Some(address)) => {
                desired.record.data = RecordData::AAAA { address };
            }
            (RecordKind::Cname, Some(target)) => {
                desired.record.data = RecordData::CNAME { target };
            }
            (RecordKind::Txt, Some(text)) => {
                desired.record.data = RecordData::TXT { text };
            }
            (RecordKind::Ns, Some(nameserver)) => {
                desired.record.data = RecordData::NS { nameserver };
            }
            (kind, Some(_)) => {
                log::warn!(
                    "override for '{}': cannot build {kind} record from bare content; ignoring type change",
                    desired.record.name
                );
            }
            (_, None) => {
                log::warn!(
                    "override for '{}': type change without content; ignoring",
                    desired.record.name
                );
            }
        }
    } else if let Some(content) = &ov.content {
        desired.record.data = match desired.record.data.clone() {
            RecordData::A { .. } => RecordData::A {
                address: content.clone(),
            },
            RecordData::AAAA { .. } => RecordData::AAAA {
                address: content.clone(),
            },
            RecordData::CNAME { .. } => RecordData::CNAME {
                target: content.clone(),
            },
            RecordData::TXT { .. } => RecordData::TXT {
                text: content.clone(),
            },
            RecordData::NS { .. } => RecordData::NS {
                nameserver: content.clone(),
            },
            RecordData::MX { priority, .. } => RecordData::MX {
                priority,
                exchange: content.clone(),
            },
            RecordData::SRV {
                priority,
                weight,
                port,
                ..
            } => RecordData::SRV {
                priority,
                weight,
                port,
                target: content.clone(),
            },
            other @ RecordData::CAA { .. } => {
                log::warn!(
                    "override for '{}': content replacement unsupported for CAA; ignoring",
                    desired.record.name
                );
                other
            }
        };
    }

    if let Some(ttl) = ov.ttl {
        desired.record.ttl = ttl;
    }
    if let Some(proxied) = ov.proxied {
        desired.record.proxied = Some(proxied);
    }
    if let Some(provider_id) = &ov.provider_id {
        desired.provider_id = Some(provider_id.clone());
    }

    desired
}
