//! `ManagedRecordRepository` implementation for `SqliteStore`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};

use trafego_core::error::{EngineError, EngineResult};
use trafego_core::traits::ManagedRecordRepository;
use trafego_core::types::{ManagedRecord, RecordSource};
use trafego_provider::RecordKey;

use crate::codec;
use crate::entity::managed_record;
use crate::SqliteStore;

impl managed_record::Model {
    fn into_managed_record(self) -> EngineResult<ManagedRecord> {
        let record = codec::decode_record(
            self.name,
            self.ttl,
            &self.data_json,
            self.proxied,
            self.comment,
        )?;
        let metadata: HashMap<String, String> = serde_json::from_str(&self.metadata_json)
            .map_err(|e| EngineError::SerializationError(format!("Invalid metadata JSON: {e}")))?;
        let source: RecordSource = self
            .source
            .parse()
            .map_err(EngineError::SerializationError)?;

        Ok(ManagedRecord {
            provider_id: self.provider_id,
            external_id: self.external_id,
            record,
            fingerprint: self.fingerprint,
            source,
            managed: self.managed != 0,
            is_orphaned: self.is_orphaned != 0,
            orphaned_at: codec::decode_time_opt(self.orphaned_at.as_deref(), "orphaned_at")?,
            first_seen_at: codec::decode_time(&self.first_seen_at, "first_seen_at")?,
            tracked_at: codec::decode_time(&self.tracked_at, "tracked_at")?,
            updated_at: codec::decode_time(&self.updated_at, "updated_at")?,
            metadata,
        })
    }
}

fn to_active_model(row: &ManagedRecord) -> EngineResult<managed_record::ActiveModel> {
    let metadata_json = serde_json::to_string(&row.metadata)
        .map_err(|e| EngineError::SerializationError(e.to_string()))?;

    Ok(managed_record::ActiveModel {
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
        source: Set(row.source.as_str().to_string()),
        managed: Set(i32::from(row.managed)),
        is_orphaned: Set(i32::from(row.is_orphaned)),
        orphaned_at: Set(row.orphaned_at.map(codec::encode_time)),
        first_seen_at: Set(codec::encode_time(row.first_seen_at)),
        tracked_at: Set(codec::encode_time(row.tracked_at)),
        updated_at: Set(codec::encode_time(row.updated_at)),
        metadata_json: Set(metadata_json),
    })
}

/// Partial updates against absent rows are a no-op, matching the
/// in-memory store's semantics.
fn ignore_missing(e: sea_orm::DbErr, context: &str) -> EngineResult<()> {
    match e {
        sea_orm::DbErr::RecordNotUpdated => Ok(()),
        other => Err(codec::storage_err(context, other)),
    }
}

const UPSERT_COLUMNS: [managed_record::Column; 16] = [
    managed_record::Column::RecordType,
    managed_record::Column::Name,
    managed_record::Column::Content,
    managed_record::Column::Ttl,
    managed_record::Column::Proxied,
    managed_record::Column::DataJson,
    managed_record::Column::Comment,
    managed_record::Column::Fingerprint,
    managed_record::Column::Source,
    managed_record::Column::Managed,
    managed_record::Column::IsOrphaned,
    managed_record::Column::OrphanedAt,
    managed_record::Column::FirstSeenAt,
    managed_record::Column::TrackedAt,
    managed_record::Column::UpdatedAt,
    managed_record::Column::MetadataJson,
];

#[async_trait]
impl ManagedRecordRepository for SqliteStore {
    async fn track(&self, record: ManagedRecord) -> EngineResult<()> {
        let model = to_active_model(&record)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| codec::storage_err("Failed to open transaction", e))?;

        // (provider_id, type, name, content) uniqueness: an upsert for
        // the same target under a different external id replaces it.
        managed_record::Entity::delete_many()
            .filter(managed_record::Column::ProviderId.eq(&record.provider_id))
            .filter(managed_record::Column::ExternalId.ne(&record.external_id))
            .filter(managed_record::Column::RecordType.eq(record.record.kind().as_str()))
            .filter(managed_record::Column::Name.eq(&record.record.name))
            .filter(managed_record::Column::Content.eq(record.record.content()))
            .exec(&txn)
            .await
            .map_err(|e| codec::storage_err("Failed to dedupe managed rows", e))?;

        managed_record::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    managed_record::Column::ProviderId,
                    managed_record::Column::ExternalId,
                ])
                .update_columns(UPSERT_COLUMNS)
                .to_owned(),
            )
            .exec(&txn)
            .await
            .map_err(|e| codec::storage_err("Failed to upsert managed row", e))?;

        txn.commit()
            .await
            .map_err(|e| codec::storage_err("Failed to commit track", e))?;
        Ok(())
    }

    async fn untrack(&self, provider_id: &str, external_id: &str) -> EngineResult<()> {
        managed_record::Entity::delete_many()
            .filter(managed_record::Column::ProviderId.eq(provider_id))
            .filter(managed_record::Column::ExternalId.eq(external_id))
            .exec(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to delete managed row", e))?;
        Ok(())
    }

    async fn list(&self, provider_id: &str) -> EngineResult<Vec<ManagedRecord>> {
        let rows = managed_record::Entity::find()
            .filter(managed_record::Column::ProviderId.eq(provider_id))
            .all(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to query managed records", e))?;

        rows.into_iter().map(|r| r.into_managed_record()).collect()
    }

    async fn list_orphaned(&self, provider_id: &str) -> EngineResult<Vec<ManagedRecord>> {
        let rows = managed_record::Entity::find()
            .filter(managed_record::Column::ProviderId.eq(provider_id))
            .filter(managed_record::Column::IsOrphaned.eq(1))
            .all(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to query orphaned records", e))?;

        rows.into_iter().map(|r| r.into_managed_record()).collect()
    }

    async fn find_by_key(
        &self,
        provider_id: &str,
        key: &RecordKey,
    ) -> EngineResult<Option<ManagedRecord>> {
        let row = managed_record::Entity::find()
            .filter(managed_record::Column::ProviderId.eq(provider_id))
            .filter(managed_record::Column::RecordType.eq(key.kind.as_str()))
            .filter(managed_record::Column::Name.eq(&key.name))
            .one(&self.db)
            .await
            .map_err(|e| codec::storage_err("Failed to query managed records", e))?;

        row.map(|r| r.into_managed_record()).transpose()
    }

    async fn find_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> EngineResult<Option<ManagedRecord>> {
        let row = managed_record::Entity::find_by_id((
            provider_id.to_string(),
            external_id.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(|e| codec::storage_err("Failed to query managed records", e))?;

        row.map(|r| r.into_managed_record()).transpose()
    }

    async fn mark_orphaned(
        &self,
        provider_id: &str,
        external_id: &str,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let update = managed_record::ActiveModel {
            provider_id: Set(provider_id.to_string()),
            external_id: Set(external_id.to_string()),
            is_orphaned: Set(1),
            orphaned_at: Set(Some(codec::encode_time(at))),
            ..Default::default()
        };
        match managed_record::Entity::update(update).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_missing(e, "Failed to mark orphaned"),
        }
    }

    async fn unmark_orphaned(&self, provider_id: &str, external_id: &str) -> EngineResult<()> {
        let update = managed_record::ActiveModel {
            provider_id: Set(provider_id.to_string()),
            external_id: Set(external_id.to_string()),
            is_orphaned: Set(0),
            orphaned_at: Set(None),
            ..Default::default()
        };
        match managed_record::Entity::update(update).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_missing(e, "Failed to unmark orphaned"),
        }
    }

    async fn rebind_external_id(
        &self,
        provider_id: &str,
        key: &RecordKey,
        new_external_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| codec::storage_err("Failed to open transaction", e))?;

        let old_row = managed_record::Entity::find()
            .filter(managed_record::Column::ProviderId.eq(provider_id))
            .filter(managed_record::Column::RecordType.eq(key.kind.as_str()))
            .filter(managed_record::Column::Name.eq(&key.name))
            .filter(managed_record::Column::ExternalId.ne(new_external_id))
            .one(&txn)
            .await
            .map_err(|e| codec::storage_err("Failed to query managed records", e))?;

        let Some(old_row) = old_row else {
            txn.commit()
                .await
                .map_err(|e| codec::storage_err("Failed to commit rebind", e))?;
            return Ok(());
        };

        let existing = managed_record::Entity::find_by_id((
            provider_id.to_string(),
            new_external_id.to_string(),
        ))
        .one(&txn)
        .await
        .map_err(|e| codec::storage_err("Failed to query managed records", e))?;

        let mut merged = old_row.clone();
        if let Some(existing) = existing {
            // Merge: keep the earlier first_seen_at; orphan state from
            // the old row carries over only when the existing row is
            // not itself live.
            if existing.first_seen_at < merged.first_seen_at {
                merged.first_seen_at = existing.first_seen_at.clone();
            }
            if existing.is_orphaned == 0 {
                merged.is_orphaned = 0;
                merged.orphaned_at = None;
            }
            managed_record::Entity::delete_by_id((
                provider_id.to_string(),
                new_external_id.to_string(),
            ))
            .exec(&txn)
            .await
            .map_err(|e| codec::storage_err("Failed to delete merged row", e))?;
        }

        managed_record::Entity::delete_by_id((
            provider_id.to_string(),
            old_row.external_id.clone(),
        ))
        .exec(&txn)
        .await
        .map_err(|e| codec::storage_err("Failed to delete rebound row", e))?;

        merged.external_id = new_external_id.to_string();
        merged.updated_at = codec::encode_time(now);
        let rebound = merged.into_managed_record()?;
        managed_record::Entity::insert(to_active_model(&rebound)?)
            .exec(&txn)
            .await
            .map_err(|e| codec::storage_err("Failed to insert rebound row", e))?;

        txn.commit()
            .await
            .map_err(|e| codec::storage_err("Failed to commit rebind", e))?;
        Ok(())
    }

    async fn set_managed(
        &self,
        provider_id: &str,
        external_id: &str,
        managed: bool,
    ) -> EngineResult<()> {
        let update = managed_record::ActiveModel {
            provider_id: Set(provider_id.to_string()),
            external_id: Set(external_id.to_string()),
            managed: Set(i32::from(managed)),
            ..Default::default()
        };
        match managed_record::Entity::update(update).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => ignore_missing(e, "Failed to toggle managed flag"),
        }
    }
}
