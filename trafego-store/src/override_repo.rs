//! `OverrideRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use trafego_core::error::{EngineError, EngineResult};
use trafego_core::traits::OverrideRepository;
use trafego_core::types::HostnameOverride;
use trafego_provider::RecordKind;

use crate::codec;
use crate::entity::hostname_override;
use crate::SqliteStore;

impl hostname_override::Model {
    fn into_override(self) -> EngineResult<HostnameOverride> {
        let record_kind: Option<RecordKind> = self
            .record_type
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| EngineError::SerializationError(format!("Invalid record_type: {e}")))?;

        Ok(HostnameOverride {
            hostname: self.hostname,
            record_kind,
            content: self.content,
            ttl: self
                .ttl
                .map(|t| {
                    u32::try_from(t).map_err(|_| {
                        EngineError::SerializationError(format!("Invalid TTL: {t}"))
                    })
                })
                .transpose()?,
            proxied: codec::decode_proxied(self.proxied),
            provider_id: self.provider_id,
            enabled: self.enabled != 0,
            reason: self.reason,
            created_at: codec::decode_time(&self.created_at, "created_at")?,
            updated_at: codec::decode_time(&self.updated_at, "updated_at")?,
        })
    }
}

fn to_active_model(entry: &HostnameOverride) -> hostname_override::ActiveModel {
    hostname_override::ActiveModel {
        hostname: Set(entry.hostname.clone()),
        record_type: Set(entry.record_kind.map(|k| k.as_str().to_string())),
        content: Set(entry.content.clone()),
        ttl: Set(entry.ttl.map(i64::from)),
        proxied: Set(codec::encode_proxied(entry.proxied)),
        provider_id: Set(entry.provider_id.clone()),
        enabled: Set(i32::from(entry.enabled)),
        reason: Set(entry.reason.clone()),
        created_at: Set(codec::encode_time(entry.created_at)),
        updated_at: Set(codec::encode_time(entry.updated_at)),
    }
}

#[async_trait]
impl OverrideRepository for SqliteStore {
    async fn list_enabled(&self) -> EngineResult<Vec<HostnameOverride>> {
        let rows = hostname_override::Entity::find()
            .filter(hostname_override::Column::Enabled.eq(1))
            .all(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to query overrides", e))?;

        rows.into_iter().map(|r| r.into_override()).collect()
    }

    async fn list_all(&self) -> EngineResult<Vec<HostnameOverride>> {
        let rows = hostname_override::Entity::find()
            .all(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to query overrides", e))?;

        rows.into_iter().map(|r| r.into_override()).collect()
    }

    async fn upsert(&self, entry: HostnameOverride) -> EngineResult<()> {
        hostname_override::Entity::insert(to_active_model(&entry))
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(hostname_override::Column::Hostname)
                    .update_columns([
                        hostname_override::Column::RecordType,
                        hostname_override::Column::Content,
                        hostname_override::Column::Ttl,
                        hostname_override::Column::Proxied,
                        hostname_override::Column::ProviderId,
                        hostname_override::Column::Enabled,
                        hostname_override::Column::Reason,
                        hostname_override::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to upsert override", e))?;
        Ok(())
    }

    async fn remove(&self, hostname: &str) -> EngineResult<()> {
        hostname_override::Entity::delete_many()
            .filter(hostname_override::Column::Hostname.eq(hostname))
            .exec(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to delete override", e))?;
        Ok(())
    }
}
