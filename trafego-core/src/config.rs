//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Tunables for the reconciliation engine.
///
/// All durations are given in seconds (milliseconds for the debounce
/// window) so the struct deserializes cleanly from flat JSON config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum age of the provider cache before a cycle refreshes it.
    pub cache_ttl_secs: u64,

    /// Interval between periodic reconciliation ticks per provider.
    pub reconcile_interval_secs: u64,

    /// Window during which desired-state triggers are coalesced into a
    /// single reconciliation.
    pub debounce_window_ms: u64,

    /// Delay between marking a managed record orphaned and deleting it.
    pub grace_window_secs: u64,

    /// Maximum concurrent operations against a single provider.
    pub max_inflight_ops: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            reconcile_interval_secs: 300,
            debounce_window_ms: 2_000,
            grace_window_secs: 86_400,
            max_inflight_ops: 4,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.reconcile_interval_secs == 0 {
            return Err(EngineError::ValidationError(
                "reconcileIntervalSecs must be > 0".to_string(),
            ));
        }
        if self.max_inflight_ops == 0 {
            return Err(EngineError::ValidationError(
                "maxInflightOps must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }

    #[must_use]
    pub fn grace_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_window_secs as i64)
    }

    #[must_use]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}
