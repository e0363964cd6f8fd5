//! Orphan detection: two-phase retirement of managed records that have
//! dropped out of the desired state.
//!
//! Phase 1 marks, phase 2 unmarks on reappearance, phase 3 (the sweep)
//! deletes only after the grace window has fully elapsed. The sweep
//! itself is planned by the reconciler at the start of the *next* cycle,
//! so a record is never marked and deleted within one pass.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use trafego_provider::RecordKey;

use crate::error::EngineResult;
use crate::services::EngineContext;
use crate::types::ManagedRecord;

/// Counters from one mark/unmark pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrphanSummary {
    pub marked: usize,
    pub unmarked: usize,
}

/// Identifies and retires managed records no longer in desired state.
pub struct OrphanDetector {
    ctx: Arc<EngineContext>,
}

impl OrphanDetector {
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Mark managed records whose key has left the desired set, and
    /// unmark orphans whose key has come back. Never deletes.
    pub async fn post_pass(
        &self,
        provider_id: &str,
        desired_keys: &HashSet<RecordKey>,
        now: DateTime<Utc>,
    ) -> EngineResult<OrphanSummary> {
        let mut summary = OrphanSummary::default();

        for row in self.ctx.managed.list(provider_id).await? {
            let in_desired = desired_keys.contains(&row.key());
            if row.is_orphaned && in_desired {
                self.ctx
                    .managed
                    .unmark_orphaned(provider_id, &row.external_id)
                    .await?;
                log::info!(
                    "[{provider_id}] '{}' reappeared in desired state, orphan state cleared",
                    row.key()
                );
                summary.unmarked += 1;
            } else if !row.is_orphaned && row.managed && !in_desired {
                self.ctx
                    .managed
                    .mark_orphaned(provider_id, &row.external_id, now)
                    .await?;
                log::info!(
                    "[{provider_id}] '{}' left desired state, marked orphaned (grace {}s)",
                    row.key(),
                    self.ctx.config.grace_window_secs
                );
                summary.marked += 1;
            }
        }

        Ok(summary)
    }

    /// Orphans whose grace window has elapsed and whose key has not
    /// reappeared in the desired set; these are due for deletion.
    #[must_use]
    pub fn sweepable(
        orphans: &[ManagedRecord],
        desired_keys: &HashSet<RecordKey>,
        now: DateTime<Utc>,
        grace: chrono::Duration,
    ) -> Vec<ManagedRecord> {
        orphans
            .iter()
            .filter(|row| {
                row.is_orphaned
                    && !desired_keys.contains(&row.key())
                    && row
                        .orphaned_at
                        .is_some_and(|at| at + grace <= now)
            })
            .cloned()
            .collect()
    }
}
