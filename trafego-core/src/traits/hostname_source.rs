//! Hostname source trait.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::types::DesiredRecord;

/// A producer of desired records.
///
/// Implementations poll or watch upstream systems (a reverse proxy API,
/// container labels, a static file) and return a **complete** snapshot
/// on every call: never a diff. The engine may call `snapshot()` at any
/// cadence and treats consecutive identical snapshots as no-ops.
#[async_trait]
pub trait HostnameSource: Send + Sync {
    /// Stable name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Produce the current full set of desired records.
    async fn snapshot(&self) -> EngineResult<Vec<DesiredRecord>>;
}
