//! Managed record repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use trafego_provider::RecordKey;

use crate::error::EngineResult;
use crate::types::ManagedRecord;

/// The engine's ownership ledger: records it has created, updated, or
/// claimed, keyed by `(provider_id, external_id)` and unique per
/// `(provider_id, type, name, content)`.
#[async_trait]
pub trait ManagedRecordRepository: Send + Sync {
    /// Insert or update a row, keyed by `(provider_id, external_id)`.
    async fn track(&self, record: ManagedRecord) -> EngineResult<()>;

    /// Remove a row. Unknown ids are a no-op.
    async fn untrack(&self, provider_id: &str, external_id: &str) -> EngineResult<()>;

    /// All rows for one provider.
    async fn list(&self, provider_id: &str) -> EngineResult<Vec<ManagedRecord>>;

    /// All rows currently marked orphaned for one provider.
    async fn list_orphaned(&self, provider_id: &str) -> EngineResult<Vec<ManagedRecord>>;

    /// Look up by `(type, name)`.
    async fn find_by_key(
        &self,
        provider_id: &str,
        key: &RecordKey,
    ) -> EngineResult<Option<ManagedRecord>>;

    /// Look up by provider-native id.
    async fn find_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> EngineResult<Option<ManagedRecord>>;

    /// Enter orphan state.
    async fn mark_orphaned(
        &self,
        provider_id: &str,
        external_id: &str,
        at: DateTime<Utc>,
    ) -> EngineResult<()>;

    /// Leave orphan state.
    async fn unmark_orphaned(&self, provider_id: &str, external_id: &str) -> EngineResult<()>;

    /// Point the row at `key` to a new provider-native id (providers may
    /// regenerate ids on edit).
    ///
    /// If a row with `new_external_id` already exists (an earlier
    /// discovery of the same target), the two rows are merged into one:
    /// the winning row keeps the new id, orphan state carries over from
    /// the old row only when the existing row is not itself live, and
    /// the losing row is deleted.
    async fn rebind_external_id(
        &self,
        provider_id: &str,
        key: &RecordKey,
        new_external_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()>;

    /// Toggle the `managed` flag (operator claim/release).
    async fn set_managed(
        &self,
        provider_id: &str,
        external_id: &str,
        managed: bool,
    ) -> EngineResult<()>;

    /// Whether `(provider_id, external_id)` is tracked with `managed = true`.
    async fn is_managed(&self, provider_id: &str, external_id: &str) -> EngineResult<bool> {
        Ok(self
            .find_by_external_id(provider_id, external_id)
            .await?
            .is_some_and(|r| r.managed))
    }
}
