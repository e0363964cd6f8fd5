//! `ProviderCacheRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use trafego_core::error::EngineResult;
use trafego_core::traits::ProviderCacheRepository;
use trafego_core::types::CachedRecord;
use trafego_provider::RecordKey;

use crate::codec;
use crate::entity::provider_cache;
use crate::SqliteStore;

impl provider_cache::Model {
    fn into_cached_record(self) -> EngineResult<CachedRecord> {
        let record = codec::decode_record(
            self.name,
            self.ttl,
            &self.data_json,
            self.proxied,
            self.comment,
        )?;
        Ok(CachedRecord {
            provider_id: self.provider_id,
            external_id: self.external_id,
            record,
            fingerprint: self.fingerprint,
            last_refreshed_at: codec::decode_time(&self.last_refreshed_at, "last_refreshed_at")?,
        })
    }
}

fn to_active_model(row: &CachedRecord) -> EngineResult<provider_cache::ActiveModel> {
    Ok(provider_cache::ActiveModel {
        provider_id: Set(row.provider_id.clone()),
        external_id: Set(row.external_id.clone()),
        record_type: Set(row.record.kind().as_str().to_string()),
        name: Set(row.record.name.clone()),
        content: Set(row.record.content().to_string()),
        ttl: Set(i64::from(row.record.ttl)),
        proxied: Set(codec::encode_proxied(row.record.proxied)),
        data_json: Set(codec::encode_data(&row.record.data)?),
        comment: Set(row.record.comment.clone()),
        fingerprint: Set(row.fingerprint.clone()),
        last_refreshed_at: Set(codec::encode_time(row.last_refreshed_at)),
    })
}

#[async_trait]
impl ProviderCacheRepository for SqliteStore {
    async fn replace_all(&self, provider_id: &str, records: Vec<CachedRecord>) -> EngineResult<()> {
        let models: Vec<provider_cache::ActiveModel> = records
            .iter()
            .map(to_active_model)
            .collect::<EngineResult<_>>()?;

        // Delete-then-insert inside one transaction: a partial refresh
        // never becomes visible.
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| codec::storage_err("Failed to open transaction", e))?;

        provider_cache::Entity::delete_many()
            .filter(provider_cache::Column::ProviderId.eq(provider_id))
            .exec(&txn)
            .await
            .map_err(|e| codec::storage_err("Failed to clear provider cache", e))?;

        if !models.is_empty() {
            provider_cache::Entity::insert_many(models)
                .exec(&txn)
                .await
                .map_err(|e| codec::storage_err("Failed to insert cache rows", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| codec::storage_err("Failed to commit cache refresh", e))?;

        Ok(())
    }

    async fn upsert(&self, record: CachedRecord) -> EngineResult<()> {
        let model = to_active_model(&record)?;
        provider_cache::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    provider_cache::Column::ProviderId,
                    provider_cache::Column::ExternalId,
                ])
                .update_columns([
                    provider_cache::Column::RecordType,
                    provider_cache::Column::Name,
                    provider_cache::Column::Content,
                    provider_cache::Column::Ttl,
                    provider_cache::Column::Proxied,
                    provider_cache::Column::DataJson,
                    provider_cache::Column::Comment,
                    provider_cache::Column::Fingerprint,
                    provider_cache::Column::LastRefreshedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to upsert cache row", e))?;
        Ok(())
    }

    async fn remove(&self, provider_id: &str, external_id: &str) -> EngineResult<()> {
        provider_cache::Entity::delete_many()
            .filter(provider_cache::Column::ProviderId.eq(provider_id))
            .filter(provider_cache::Column::ExternalId.eq(external_id))
            .exec(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to delete cache row", e))?;
        Ok(())
    }

    async fn list(&self, provider_id: &str) -> EngineResult<Vec<CachedRecord>> {
        let rows = provider_cache::Entity::find()
            .filter(provider_cache::Column::ProviderId.eq(provider_id))
            .all(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to query provider cache", e))?;

        rows.into_iter().map(|r| r.into_cached_record()).collect()
    }

    async fn find_by_key(
        &self,
        provider_id: &str,
        key: &RecordKey,
    ) -> EngineResult<Option<CachedRecord>> {
        let row = provider_cache::Entity::find()
            .filter(provider_cache::Column::ProviderId.eq(provider_id))
            .filter(provider_cache::Column::RecordType.eq(key.kind.as_str()))
            .filter(provider_cache::Column::Name.eq(&key.name))
            .one(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to query provider cache", e))?;

        row.map(|r| r.into_cached_record()).transpose()
    }

    async fn find_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> EngineResult<Option<CachedRecord>> {
        let row = provider_cache::Entity::find_by_id((
            provider_id.to_string(),
            external_id.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(|e| codec::storage_err("Failed to query provider cache", e))?;

        row.map(|r| r.into_cached_record()).transpose()
    }

    async fn last_refreshed_at(&self, provider_id: &str) -> EngineResult<Option<DateTime<Utc>>> {
        let row = provider_cache::Entity::find()
            .filter(provider_cache::Column::ProviderId.eq(provider_id))
            .order_by_desc(provider_cache::Column::LastRefreshedAt)
            .one(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to query provider cache", e))?;

        match row {
            Some(r) => Ok(Some(codec::decode_time(
                &r.last_refreshed_at,
                "last_refreshed_at",
            )?)),
            None => Ok(None),
        }
    }
}
