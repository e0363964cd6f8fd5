//! In-memory repository implementations.
//!
//! Back the engine test-suite and state-less deployments where losing
//! the managed ledger on restart is acceptable (ownership markers allow
//! recovery on providers with comment support).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use trafego_provider::RecordKey;

use crate::error::EngineResult;
use crate::traits::{ManagedRecordRepository, OverrideRepository, ProviderCacheRepository};
use crate::types::{CachedRecord, HostnameOverride, ManagedRecord};

type Key = (String, String); // (provider_id, external_id)

/// In-memory provider cache.
#[derive(Clone, Default)]
pub struct MemoryProviderCache {
    rows: Arc<RwLock<HashMap<Key, CachedRecord>>>,
    refreshed: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl MemoryProviderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderCacheRepository for MemoryProviderCache {
    async fn replace_all(&self, provider_id: &str, records: Vec<CachedRecord>) -> EngineResult<()> {
        let mut rows = self.rows.write().await;
        rows.retain(|(pid, _), _| pid != provider_id);
        let mut latest: Option<DateTime<Utc>> = None;
        for record in records {
            latest = Some(latest.map_or(record.last_refreshed_at, |t| {
                t.max(record.last_refreshed_at)
            }));
            rows.insert(
                (record.provider_id.clone(), record.external_id.clone()),
                record,
            );
        }
        drop(rows);
        let stamp = latest.unwrap_or_else(Utc::now);
        self.refreshed
            .write()
            .await
            .insert(provider_id.to_string(), stamp);
        Ok(())
    }

    async fn upsert(&self, record: CachedRecord) -> EngineResult<()> {
        self.rows.write().await.insert(
            (record.provider_id.clone(), record.external_id.clone()),
            record,
        );
        Ok(())
    }

    async fn remove(&self, provider_id: &str, external_id: &str) -> EngineResult<()> {
        self.rows
            .write()
            .await
            .remove(&(provider_id.to_string(), external_id.to_string()));
        Ok(())
    }

    async fn list(&self, provider_id: &str) -> EngineResult<Vec<CachedRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn find_by_key(
        &self,
        provider_id: &str,
        key: &RecordKey,
    ) -> EngineResult<Option<CachedRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|r| r.provider_id == provider_id && &r.key() == key)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> EngineResult<Option<CachedRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&(provider_id.to_string(), external_id.to_string()))
            .cloned())
    }

    async fn last_refreshed_at(&self, provider_id: &str) -> EngineResult<Option<DateTime<Utc>>> {
        let has_rows = self
            .rows
            .read()
            .await
            .keys()
            .any(|(pid, _)| pid == provider_id);
        if !has_rows {
            return Ok(None);
        }
        Ok(self.refreshed.read().await.get(provider_id).copied())
    }
}

/// In-memory managed record store.
#[derive(Clone, Default)]
pub struct MemoryManagedRecords {
    rows: Arc<RwLock<HashMap<Key, ManagedRecord>>>,
}

impl MemoryManagedRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManagedRecordRepository for MemoryManagedRecords {
    async fn track(&self, record: ManagedRecord) -> EngineResult<()> {
        let mut rows = self.rows.write().await;
        // (provider_id, type, name, content) uniqueness: an upsert for the
        // same target under a different external id replaces the old row.
        rows.retain(|_, existing| {
            !(existing.provider_id == record.provider_id
                && existing.external_id != record.external_id
                && existing.key() == record.key()
                && existing.record.content() == record.record.content())
        });
        rows.insert(
            (record.provider_id.clone(), record.external_id.clone()),
            record,
        );
        Ok(())
    }

    async fn untrack(&self, provider_id: &str, external_id: &str) -> EngineResult<()> {
        self.rows
            .write()
            .await
            .remove(&(provider_id.to_string(), external_id.to_string()));
        Ok(())
    }

    async fn list(&self, provider_id: &str) -> EngineResult<Vec<ManagedRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn list_orphaned(&self, provider_id: &str) -> EngineResult<Vec<ManagedRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.provider_id == provider_id && r.is_orphaned)
            .cloned()
            .collect())
    }

    async fn find_by_key(
        &self,
        provider_id: &str,
        key: &RecordKey,
    ) -> EngineResult<Option<ManagedRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|r| r.provider_id == provider_id && &r.key() == key)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> EngineResult<Option<ManagedRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&(provider_id.to_string(), external_id.to_string()))
            .cloned())
    }

    async fn mark_orphaned(
        &self,
        provider_id: &str,
        external_id: &str,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        if let Some(row) = self
            .rows
            .write()
            .await
            .get_mut(&(provider_id.to_string(), external_id.to_string()))
        {
            row.is_orphaned = true;
            row.orphaned_at = Some(at);
        }
        Ok(())
    }

    async fn unmark_orphaned(&self, provider_id: &str, external_id: &str) -> EngineResult<()> {
        if let Some(row) = self
            .rows
            .write()
            .await
            .get_mut(&(provider_id.to_string(), external_id.to_string()))
        {
            row.is_orphaned = false;
            row.orphaned_at = None;
        }
        Ok(())
    }

    async fn rebind_external_id(
        &self,
        provider_id: &str,
        key: &RecordKey,
        new_external_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut rows = self.rows.write().await;

        let old_key = rows
            .iter()
            .find(|((pid, ext), r)| {
                pid == provider_id && ext != new_external_id && &r.key() == key
            })
            .map(|(k, _)| k.clone());

        let Some(old_key) = old_key else {
            return Ok(());
        };

        let Some(mut old_row) = rows.remove(&old_key) else {
            return Ok(());
        };

        let new_key = (provider_id.to_string(), new_external_id.to_string());
        if let Some(existing) = rows.remove(&new_key) {
            // Merge: the surviving row keeps the earlier first_seen_at;
            // orphan state from the old row carries over only when the
            // existing row is not itself live.
            old_row.first_seen_at = old_row.first_seen_at.min(existing.first_seen_at);
            if !existing.is_orphaned {
                old_row.is_orphaned = false;
                old_row.orphaned_at = None;
            }
        }

        old_row.external_id = new_external_id.to_string();
        old_row.updated_at = now;
        rows.insert(new_key, old_row);
        Ok(())
    }

    async fn set_managed(
        &self,
        provider_id: &str,
        external_id: &str,
        managed: bool,
    ) -> EngineResult<()> {
        if let Some(row) = self
            .rows
            .write()
            .await
            .get_mut(&(provider_id.to_string(), external_id.to_string()))
        {
            row.managed = managed;
        }
        Ok(())
    }
}

/// In-memory hostname override store.
#[derive(Clone, Default)]
pub struct MemoryOverrides {
    rows: Arc<RwLock<HashMap<String, HostnameOverride>>>,
}

impl MemoryOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OverrideRepository for MemoryOverrides {
    async fn list_enabled(&self) -> EngineResult<Vec<HostnameOverride>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|o| o.enabled)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> EngineResult<Vec<HostnameOverride>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn upsert(&self, entry: HostnameOverride) -> EngineResult<()> {
        self.rows
            .write()
            .await
            .insert(entry.hostname.clone(), entry);
        Ok(())
    }

    async fn remove(&self, hostname: &str) -> EngineResult<()> {
        self.rows.write().await.remove(hostname);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordSource;
    use trafego_provider::{Record, RecordData, RecordKind};

    fn managed(provider: &str, ext: &str, name: &str, content: &str) -> ManagedRecord {
        ManagedRecord::track_new(
            provider,
            ext,
            Record::new(
                name,
                300,
                RecordData::A {
                    address: content.to_string(),
                },
            ),
            RecordSource::Managed,
            true,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn replace_all_drops_stale_rows() {
        let cache = MemoryProviderCache::new();
        let now = Utc::now();
        let row = |ext: &str| {
            CachedRecord::from_listing(
                "p1",
                trafego_provider::ProviderRecord::new(
                    ext,
                    Record::new(
                        format!("{ext}.example.com"),
                        300,
                        RecordData::A {
                            address: "1.2.3.4".to_string(),
                        },
                    ),
                ),
                now,
            )
        };
        cache.replace_all("p1", vec![row("a"), row("b")]).await.unwrap();
        cache.replace_all("p1", vec![row("b")]).await.unwrap();

        let rows = cache.list("p1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].external_id, "b");
    }

    #[tokio::test]
    async fn last_refreshed_none_without_rows() {
        let cache = MemoryProviderCache::new();
        assert!(cache.last_refreshed_at("p1").await.unwrap().is_none());
        cache.replace_all("p1", vec![]).await.unwrap();
        // Still no rows, so still "needs refresh".
        assert!(cache.last_refreshed_at("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rebind_moves_row_and_merges() {
        let store = MemoryManagedRecords::new();
        let now = Utc::now();
        store
            .track(managed("p1", "old-id", "app.example.com", "1.2.3.4"))
            .await
            .unwrap();
        store
            .mark_orphaned("p1", "old-id", now)
            .await
            .unwrap();
        // A live row already exists under the new id.
        store
            .track(managed("p1", "new-id", "app.example.com", "5.6.7.8"))
            .await
            .unwrap();

        let key = RecordKey::new(RecordKind::A, "app.example.com");
        store
            .rebind_external_id("p1", &key, "new-id", now)
            .await
            .unwrap();

        let rows = store.list("p1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].external_id, "new-id");
        // Existing row was live, so orphan state was not carried over.
        assert!(!rows[0].is_orphaned);
    }

    #[tokio::test]
    async fn track_enforces_content_uniqueness() {
        let store = MemoryManagedRecords::new();
        store
            .track(managed("p1", "id-1", "app.example.com", "1.2.3.4"))
            .await
            .unwrap();
        // Same (type, name, content), different external id: one row survives.
        store
            .track(managed("p1", "id-2", "app.example.com", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(store.list("p1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn overrides_filter_enabled() {
        let repo = MemoryOverrides::new();
        let mut active = HostnameOverride::new("a.example.com", Utc::now());
        active.ttl = Some(60);
        let mut inactive = HostnameOverride::new("b.example.com", Utc::now());
        inactive.enabled = false;
        repo.upsert(active).await.unwrap();
        repo.upsert(inactive).await.unwrap();

        assert_eq!(repo.list_enabled().await.unwrap().len(), 1);
        assert_eq!(repo.list_all().await.unwrap().len(), 2);
    }
}
