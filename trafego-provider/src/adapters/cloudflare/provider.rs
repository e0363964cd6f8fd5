//! Cloudflare `DnsAdapter` trait implementation.

use async_trait::async_trait;

use crate::error::{AdapterError, Result};
use crate::record::{canonicalize, Record, RecordData};
use crate::traits::{AdapterErrorMapper, DnsAdapter, ErrorContext};
use crate::types::{
    AdapterKind, AdapterMetadata, AdapterSettings, Capabilities, CredentialField, FieldType,
    ProviderRecord, RecordFilter,
};

use super::{
    CloudflareAdapter, CloudflareDnsRecord, CloudflareZone, MAX_PAGE_SIZE_RECORDS,
};
use super::types::{CloudflareCaaData, CloudflareSrvData};

impl CloudflareAdapter {
    /// Resolve and cache the zone id for the configured zone name.
    async fn zone_id(&self) -> Result<&str> {
        self.zone_id
            .get_or_try_init(|| async {
                let ctx = ErrorContext {
                    zone: Some(self.settings.zone.clone()),
                    ..Default::default()
                };
                let (zones, _): (Vec<CloudflareZone>, u32) = self
                    .get_paginated(
                        &format!("/zones?name={}", urlencoding::encode(&self.settings.zone)),
                        ctx,
                    )
                    .await?;

                zones
                    .into_iter()
                    .next()
                    .map(|z| z.id)
                    .ok_or_else(|| AdapterError::ZoneNotFound {
                        provider: "cloudflare".to_string(),
                        zone: self.settings.zone.clone(),
                    })
            })
            .await
            .map(String::as_str)
    }

    /// Convert a Cloudflare record into the canonical model.
    fn cf_record_to_provider_record(
        &self,
        cf_record: CloudflareDnsRecord,
    ) -> Result<ProviderRecord> {
        let data = self.parse_record_data(&cf_record)?;

        let record = canonicalize(Record {
            name: cf_record.name,
            ttl: cf_record.ttl,
            data,
            proxied: cf_record.proxied,
            comment: cf_record.comment,
        })?;

        Ok(ProviderRecord::new(cf_record.id, record))
    }

    fn parse_record_data(&self, cf_record: &CloudflareDnsRecord) -> Result<RecordData> {
        match cf_record.record_type.as_str() {
            "A" => Ok(RecordData::A {
                address: cf_record.content.clone(),
            }),
            "AAAA" => Ok(RecordData::AAAA {
                address: cf_record.content.clone(),
            }),
            "CNAME" => Ok(RecordData::CNAME {
                target: cf_record.content.clone(),
            }),
            "TXT" => Ok(RecordData::TXT {
                text: cf_record.content.trim_matches('"').to_string(),
            }),
            "NS" => Ok(RecordData::NS {
                nameserver: cf_record.content.clone(),
            }),
            "MX" => Ok(RecordData::MX {
                priority: cf_record
                    .priority
                    .ok_or_else(|| self.parse_error("MX record missing priority field"))?,
                exchange: cf_record.content.clone(),
            }),
            "SRV" => {
                let data = cf_record
                    .data
                    .as_ref()
                    .ok_or_else(|| self.parse_error("SRV record missing data field"))?;
                let srv: CloudflareSrvData = serde_json::from_value(data.clone())
                    .map_err(|e| self.parse_error(format!("Failed to parse SRV data: {e}")))?;
                Ok(RecordData::SRV {
                    priority: srv.priority,
                    weight: srv.weight,
                    port: srv.port,
                    target: srv.target,
                })
            }
            "CAA" => {
                let data = cf_record
                    .data
                    .as_ref()
                    .ok_or_else(|| self.parse_error("CAA record missing data field"))?;
                let caa: CloudflareCaaData = serde_json::from_value(data.clone())
                    .map_err(|e| self.parse_error(format!("Failed to parse CAA data: {e}")))?;
                Ok(RecordData::CAA {
                    flags: caa.flags,
                    tag: caa.tag,
                    value: caa.value,
                })
            }
            other => Err(AdapterError::UnsupportedRecordType {
                provider: "cloudflare".to_string(),
                record_type: other.to_string(),
            }),
        }
    }

    /// Build the Cloudflare request body for a canonical record.
    ///
    /// Cloudflare uses `ttl = 1` for "automatic"; the engine's `0`
    /// (provider default) sentinel maps onto it, while `1` passes
    /// through untouched.
    fn build_record_body(&self, record: &Record) -> serde_json::Value {
        let ttl = if record.ttl == 0 { 1 } else { record.ttl };
        let name = &record.name;

        let mut body = match &record.data {
            RecordData::A { address } => serde_json::json!({
                "type": "A",
                "name": name,
                "content": address,
                "ttl": ttl,
                "proxied": record.proxied,
            }),
            RecordData::AAAA { address } => serde_json::json!({
                "type": "AAAA",
                "name": name,
                "content": address,
                "ttl": ttl,
                "proxied": record.proxied,
            }),
            RecordData::CNAME { target } => serde_json::json!({
                "type": "CNAME",
                "name": name,
                "content": target,
                "ttl": ttl,
                "proxied": record.proxied,
            }),
            RecordData::TXT { text } => serde_json::json!({
                "type": "TXT",
                "name": name,
                "content": text,
                "ttl": ttl,
            }),
            RecordData::NS { nameserver } => serde_json::json!({
                "type": "NS",
                "name": name,
                "content": nameserver,
                "ttl": ttl,
            }),
            RecordData::MX { priority, exchange } => serde_json::json!({
                "type": "MX",
                "name": name,
                "content": exchange,
                "ttl": ttl,
                "priority": priority,
            }),
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => serde_json::json!({
                "type": "SRV",
                "name": name,
                "ttl": ttl,
                "data": {
                    "priority": priority,
                    "weight": weight,
                    "port": port,
                    "target": target,
                }
            }),
            RecordData::CAA { flags, tag, value } => serde_json::json!({
                "type": "CAA",
                "name": name,
                "ttl": ttl,
                "data": {
                    "flags": flags,
                    "tag": tag,
                    "value": value,
                }
            }),
        };

        if let Some(comment) = &record.comment {
            body["comment"] = serde_json::Value::String(comment.clone());
        }

        body
    }
}

#[async_trait]
impl DnsAdapter for CloudflareAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Cloudflare
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn metadata() -> AdapterMetadata {
        AdapterMetadata {
            kind: AdapterKind::Cloudflare,
            name: "Cloudflare".to_string(),
            description: "Cloudflare DNS with CDN proxying and record comments".to_string(),
            required_fields: vec![CredentialField {
                key: "apiToken".to_string(),
                label: "API Token".to_string(),
                field_type: FieldType::Password,
                help_text: Some(
                    "Create under Cloudflare Dashboard -> My Profile -> API Tokens".to_string(),
                ),
            }],
            capabilities: Capabilities {
                proxying: true,
                multi_value_a: true,
                caa: true,
                srv: true,
                comments: true,
            },
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            proxying: true,
            multi_value_a: true,
            caa: true,
            srv: true,
            comments: true,
        }
    }

    fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    async fn init(&self) -> Result<()> {
        let zone_id = self.zone_id().await?;
        log::info!(
            "[cloudflare] provider '{}' ready, zone '{}' -> {}",
            self.provider_id,
            self.settings.zone,
            zone_id
        );
        Ok(())
    }

    async fn list_records(&self, filter: Option<&RecordFilter>) -> Result<Vec<ProviderRecord>> {
        let zone_id = self.zone_id().await?.to_string();
        let ctx = ErrorContext {
            zone: Some(self.settings.zone.clone()),
            ..Default::default()
        };

        let mut records = Vec::new();
        let mut page = 1u32;
        loop {
            let mut url = format!(
                "/zones/{zone_id}/dns_records?page={page}&per_page={MAX_PAGE_SIZE_RECORDS}"
            );
            if let Some(f) = filter {
                if let Some(kind) = f.kind {
                    url.push_str(&format!("&type={}", urlencoding::encode(kind.as_str())));
                }
                if let Some(name) = &f.name {
                    url.push_str(&format!("&name={}", urlencoding::encode(name)));
                }
            }

            let (cf_records, total): (Vec<CloudflareDnsRecord>, u32) =
                self.get_paginated(&url, ctx.clone()).await?;
            let fetched = cf_records.len() as u32;

            for cf_record in cf_records {
                match self.cf_record_to_provider_record(cf_record) {
                    Ok(rec) => records.push(rec),
                    // Zones can contain types the engine does not model
                    // (LOC, PTR, ...); they are invisible to reconciliation.
                    Err(AdapterError::UnsupportedRecordType { record_type, .. }) => {
                        log::debug!("[cloudflare] skipping unsupported record type {record_type}");
                    }
                    Err(e) => return Err(e),
                }
            }

            if fetched < MAX_PAGE_SIZE_RECORDS || (page * MAX_PAGE_SIZE_RECORDS) >= total {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    async fn create_record(&self, record: &Record) -> Result<ProviderRecord> {
        let zone_id = self.zone_id().await?.to_string();
        let ctx = ErrorContext {
            record_name: Some(record.name.clone()),
            zone: Some(self.settings.zone.clone()),
            ..Default::default()
        };

        let body = self.build_record_body(record);
        let cf_record: CloudflareDnsRecord = self
            .post_json(&format!("/zones/{zone_id}/dns_records"), body, ctx)
            .await?;

        self.cf_record_to_provider_record(cf_record)
    }

    async fn update_record(&self, external_id: &str, record: &Record) -> Result<ProviderRecord> {
        let zone_id = self.zone_id().await?.to_string();
        let ctx = ErrorContext {
            record_name: Some(record.name.clone()),
            external_id: Some(external_id.to_string()),
            zone: Some(self.settings.zone.clone()),
        };

        let body = self.build_record_body(record);
        let cf_record: CloudflareDnsRecord = self
            .patch_json(
                &format!("/zones/{zone_id}/dns_records/{external_id}"),
                body,
                ctx,
            )
            .await?;

        self.cf_record_to_provider_record(cf_record)
    }

    async fn delete_record(&self, external_id: &str) -> Result<()> {
        let zone_id = self.zone_id().await?.to_string();
        let ctx = ErrorContext {
            external_id: Some(external_id.to_string()),
            zone: Some(self.settings.zone.clone()),
            ..Default::default()
        };

        match self
            .delete(&format!("/zones/{zone_id}/dns_records/{external_id}"), ctx)
            .await
        {
            Ok(()) => Ok(()),
            // Deleting an id that no longer exists counts as success.
            Err(AdapterError::RecordNotFound { .. }) => {
                log::debug!("[cloudflare] delete of unknown record {external_id}, treating as success");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
