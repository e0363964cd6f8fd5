//! Provider cache repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use trafego_provider::RecordKey;

use crate::error::EngineResult;
use crate::types::CachedRecord;

/// Local mirror of every record observed at a provider, keyed by
/// `(provider_id, external_id)`.
#[async_trait]
pub trait ProviderCacheRepository: Send + Sync {
    /// Replace the cached view of one provider with a fresh listing.
    ///
    /// Upserts every row in `records` and deletes rows for this provider
    /// whose `external_id` is absent from the listing. Implementations
    /// MUST execute this atomically so a partial refresh never exposes
    /// an inconsistent view.
    async fn replace_all(&self, provider_id: &str, records: Vec<CachedRecord>) -> EngineResult<()>;

    /// Upsert a single row (cache maintenance after a create/update).
    async fn upsert(&self, record: CachedRecord) -> EngineResult<()>;

    /// Remove a single row (cache maintenance after a delete).
    async fn remove(&self, provider_id: &str, external_id: &str) -> EngineResult<()>;

    /// All cached rows for one provider.
    async fn list(&self, provider_id: &str) -> EngineResult<Vec<CachedRecord>>;

    /// Look up by `(type, name)`.
    async fn find_by_key(
        &self,
        provider_id: &str,
        key: &RecordKey,
    ) -> EngineResult<Option<CachedRecord>>;

    /// Look up by provider-native id.
    async fn find_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> EngineResult<Option<CachedRecord>>;

    /// Most recent refresh timestamp for this provider, or `None` when
    /// the provider has no rows (which also means "needs refresh").
    async fn last_refreshed_at(&self, provider_id: &str) -> EngineResult<Option<DateTime<Utc>>>;
}
