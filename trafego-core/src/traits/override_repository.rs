//! Hostname override repository trait.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::types::HostnameOverride;

/// Storage for per-hostname overrides applied by the aggregator.
#[async_trait]
pub trait OverrideRepository: Send + Sync {
    /// All overrides with `enabled = true`.
    async fn list_enabled(&self) -> EngineResult<Vec<HostnameOverride>>;

    /// All overrides, enabled or not.
    async fn list_all(&self) -> EngineResult<Vec<HostnameOverride>>;

    /// Insert or update the override for a hostname.
    async fn upsert(&self, entry: HostnameOverride) -> EngineResult<()>;

    /// Remove the override for a hostname. Unknown hostnames are a no-op.
    async fn remove(&self, hostname: &str) -> EngineResult<()>;
}
