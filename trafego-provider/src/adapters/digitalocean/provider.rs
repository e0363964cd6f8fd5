//! DigitalOcean `DnsAdapter` trait implementation.

use async_trait::async_trait;

use crate::adapters::common::{full_name_to_relative, relative_to_full_name};
use crate::error::{AdapterError, Result};
use crate::record::{canonicalize, Record, RecordData};
use crate::traits::{AdapterErrorMapper, DnsAdapter, ErrorContext};
use crate::types::{
    AdapterKind, AdapterMetadata, AdapterSettings, Capabilities, CredentialField, FieldType,
    ProviderRecord, RecordFilter,
};

use super::types::DoRecordBody;
use super::{
    DigitaloceanAdapter, DoDomainRecord, DoRecordList, DoSingleRecord, MAX_PAGE_SIZE_RECORDS,
};

/// Append the trailing dot DigitalOcean expects on absolute hostnames.
fn fqdn(name: &str) -> String {
    if name == "." || name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

impl DigitaloceanAdapter {
    /// Convert a DigitalOcean record into the canonical model.
    fn do_record_to_provider_record(&self, do_record: DoDomainRecord) -> Result<ProviderRecord> {
        let name = relative_to_full_name(&do_record.name, &self.settings.zone);
        let data = match do_record.record_type.as_str() {
            "A" => RecordData::A {
                address: do_record.data,
            },
            "AAAA" => RecordData::AAAA {
                address: do_record.data,
            },
            "CNAME" => RecordData::CNAME {
                target: do_record.data,
            },
            "TXT" => RecordData::TXT {
                text: do_record.data,
            },
            "NS" => RecordData::NS {
                nameserver: do_record.data,
            },
            "MX" => RecordData::MX {
                priority: do_record
                    .priority
                    .ok_or_else(|| self.parse_error("MX record missing priority field"))?,
                exchange: do_record.data,
            },
            "SRV" => RecordData::SRV {
                priority: do_record
                    .priority
                    .ok_or_else(|| self.parse_error("SRV record missing priority field"))?,
                weight: do_record.weight.unwrap_or(0),
                port: do_record.port.unwrap_or(0),
                target: do_record.data,
            },
            "CAA" => RecordData::CAA {
                flags: do_record.flags.unwrap_or(0),
                tag: do_record
                    .tag
                    .ok_or_else(|| self.parse_error("CAA record missing tag field"))?,
                value: do_record.data,
            },
            other => {
                return Err(AdapterError::UnsupportedRecordType {
                    provider: "digitalocean".to_string(),
                    record_type: other.to_string(),
                })
            }
        };

        let record = canonicalize(Record {
            name,
            ttl: do_record.ttl,
            data,
            proxied: None,
            comment: None,
        })?;

        Ok(ProviderRecord::new(do_record.id.to_string(), record))
    }

    /// Build the request body for a canonical record.
    ///
    /// DigitalOcean wants zone-relative names and trailing-dot FQDNs in
    /// hostname-valued data fields. Its minimum TTL is 30, so the `0`/`1`
    /// sentinels are replaced by the instance default (or 1800).
    fn build_record_body<'a>(&self, record: &'a Record) -> DoRecordBody<'a> {
        let name_owned = full_name_to_relative(&record.name, &self.settings.zone);
        let ttl = match record.ttl {
            0 | 1 => {
                if self.settings.default_ttl >= 30 {
                    self.settings.default_ttl
                } else {
                    1800
                }
            }
            t => t,
        };

        let (record_type, data, priority, weight, port, flags, tag) = match &record.data {
            RecordData::A { address } => ("A", address.clone(), None, None, None, None, None),
            RecordData::AAAA { address } => ("AAAA", address.clone(), None, None, None, None, None),
            RecordData::CNAME { target } => ("CNAME", fqdn(target), None, None, None, None, None),
            RecordData::TXT { text } => ("TXT", text.clone(), None, None, None, None, None),
            RecordData::NS { nameserver } => ("NS", fqdn(nameserver), None, None, None, None, None),
            RecordData::MX { priority, exchange } => (
                "MX",
                fqdn(exchange),
                Some(*priority),
                None,
                None,
                None,
                None,
            ),
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => (
                "SRV",
                fqdn(target),
                Some(*priority),
                Some(*weight),
                Some(*port),
                None,
                None,
            ),
            RecordData::CAA { flags, tag, value } => (
                "CAA",
                value.clone(),
                None,
                None,
                None,
                Some(*flags),
                Some(tag.as_str()),
            ),
        };

        DoRecordBody {
            record_type,
            name: name_owned,
            data,
            ttl,
            priority,
            weight,
            port,
            flags,
            tag,
        }
    }
}

#[async_trait]
impl DnsAdapter for DigitaloceanAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Digitalocean
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn metadata() -> AdapterMetadata {
        AdapterMetadata {
            kind: AdapterKind::Digitalocean,
            name: "DigitalOcean".to_string(),
            description: "DigitalOcean managed DNS".to_string(),
            required_fields: vec![CredentialField {
                key: "apiToken".to_string(),
                label: "API Token".to_string(),
                field_type: FieldType::Password,
                help_text: Some(
                    "Create under DigitalOcean Control Panel -> API -> Tokens".to_string(),
                ),
            }],
            capabilities: Capabilities {
                proxying: false,
                multi_value_a: true,
                caa: true,
                srv: true,
                comments: false,
            },
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            proxying: false,
            multi_value_a: true,
            caa: true,
            srv: true,
            comments: false,
        }
    }

    fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    async fn init(&self) -> Result<()> {
        let ctx = ErrorContext {
            zone: Some(self.settings.zone.clone()),
            ..Default::default()
        };
        let _: serde_json::Value = self
            .get(&format!("/domains/{}", self.settings.zone), ctx)
            .await?;
        log::info!(
            "[digitalocean] provider '{}' ready, domain '{}'",
            self.provider_id,
            self.settings.zone
        );
        Ok(())
    }

    async fn list_records(&self, filter: Option<&RecordFilter>) -> Result<Vec<ProviderRecord>> {
        let ctx = ErrorContext {
            zone: Some(self.settings.zone.clone()),
            ..Default::default()
        };

        let mut records = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "/domains/{}/records?page={page}&per_page={MAX_PAGE_SIZE_RECORDS}",
                self.settings.zone
            );
            let list: DoRecordList = self.get(&url, ctx.clone()).await?;
            let fetched = list.domain_records.len() as u32;

            for do_record in list.domain_records {
                match self.do_record_to_provider_record(do_record) {
                    Ok(rec) => records.push(rec),
                    Err(AdapterError::UnsupportedRecordType { record_type, .. }) => {
                        log::debug!(
                            "[digitalocean] skipping unsupported record type {record_type}"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            if fetched < MAX_PAGE_SIZE_RECORDS {
                break;
            }
            page += 1;
        }

        if let Some(f) = filter {
            records.retain(|r| {
                f.kind.is_none_or(|k| r.record.kind() == k)
                    && f.name.as_deref().is_none_or(|n| r.record.name == n)
            });
        }

        Ok(records)
    }

    async fn create_record(&self, record: &Record) -> Result<ProviderRecord> {
        let ctx = ErrorContext {
            record_name: Some(record.name.clone()),
            zone: Some(self.settings.zone.clone()),
            ..Default::default()
        };

        let body = self.build_record_body(record);
        let created: DoSingleRecord = self
            .post_json(
                &format!("/domains/{}/records", self.settings.zone),
                &body,
                ctx,
            )
            .await?;

        self.do_record_to_provider_record(created.domain_record)
    }

    async fn update_record(&self, external_id: &str, record: &Record) -> Result<ProviderRecord> {
        let ctx = ErrorContext {
            record_name: Some(record.name.clone()),
            external_id: Some(external_id.to_string()),
            zone: Some(self.settings.zone.clone()),
        };

        let body = self.build_record_body(record);
        let updated: DoSingleRecord = self
            .put_json(
                &format!("/domains/{}/records/{external_id}", self.settings.zone),
                &body,
                ctx,
            )
            .await?;

        self.do_record_to_provider_record(updated.domain_record)
    }

    async fn delete_record(&self, external_id: &str) -> Result<()> {
        let status = self
            .delete(&format!(
                "/domains/{}/records/{external_id}",
                self.settings.zone
            ))
            .await?;

        match status {
            // 204 on success; 404 means it was already gone.
            204 | 404 => Ok(()),
            other => Err(self.map_status_error(
                other,
                "",
                ErrorContext {
                    external_id: Some(external_id.to_string()),
                    zone: Some(self.settings.zone.clone()),
                    ..Default::default()
                },
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> DigitaloceanAdapter {
        DigitaloceanAdapter::new(
            "do-1",
            "token".to_string(),
            crate::types::AdapterSettings::new("example.com"),
        )
    }

    #[test]
    fn wire_record_converted_to_fqdn() {
        let rec = adapter()
            .do_record_to_provider_record(DoDomainRecord {
                id: 42,
                record_type: "A".to_string(),
                name: "www".to_string(),
                data: "1.2.3.4".to_string(),
                ttl: 1800,
                priority: None,
                weight: None,
                port: None,
                flags: None,
                tag: None,
            })
            .unwrap();
        assert_eq!(rec.external_id, "42");
        assert_eq!(rec.record.name, "www.example.com");
        assert_eq!(rec.record.content(), "1.2.3.4");
    }

    #[test]
    fn apex_record_name_resolved() {
        let rec = adapter()
            .do_record_to_provider_record(DoDomainRecord {
                id: 1,
                record_type: "TXT".to_string(),
                name: "@".to_string(),
                data: "v=spf1 -all".to_string(),
                ttl: 3600,
                priority: None,
                weight: None,
                port: None,
                flags: None,
                tag: None,
            })
            .unwrap();
        assert_eq!(rec.record.name, "example.com");
    }

    #[test]
    fn cname_data_trailing_dot_stripped() {
        let rec = adapter()
            .do_record_to_provider_record(DoDomainRecord {
                id: 2,
                record_type: "CNAME".to_string(),
                name: "alias".to_string(),
                data: "target.example.net.".to_string(),
                ttl: 300,
                priority: None,
                weight: None,
                port: None,
                flags: None,
                tag: None,
            })
            .unwrap();
        assert_eq!(rec.record.content(), "target.example.net");
    }

    #[test]
    fn body_uses_relative_name_and_fqdn_data() {
        let record = Record::new(
            "alias.example.com",
            300,
            RecordData::CNAME {
                target: "target.example.net".to_string(),
            },
        );
        let body = adapter().build_record_body(&record);
        assert_eq!(body.name, "alias");
        assert_eq!(body.data, "target.example.net.");
        assert_eq!(body.record_type, "CNAME");
    }

    #[test]
    fn body_ttl_sentinel_replaced() {
        let record = Record::new(
            "www.example.com",
            1,
            RecordData::A {
                address: "1.2.3.4".to_string(),
            },
        );
        let body = adapter().build_record_body(&record);
        assert_eq!(body.ttl, 1800);
    }
}
