//! Scheduler and control plane.
//!
//! One worker task per provider, driven by a periodic tick and a bounded
//! trigger channel. Triggers arriving within the debounce window
//! coalesce into a single reconciliation. The per-provider mutex inside
//! the reconciler keeps the single-writer guarantee even when admin
//! calls race the workers; admin calls that lose the race return
//! immediately instead of queueing.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch, RwLock};

use crate::error::{EngineError, EngineResult};
use crate::services::{DesiredSet, EngineContext, HostnameAggregator, Reconciler};
use crate::types::{CachedRecord, ManagedRecord, Plan, PlanResult, RecordSource};

/// Capacity of each per-provider trigger channel. Triggers beyond this
/// are dropped; the pending ones already imply a reconciliation.
const TRIGGER_CHANNEL_CAPACITY: usize = 16;

/// External stimulus for a provider worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Desired state may have changed; reconcile soon.
    DesiredChanged,
    /// Re-apply every desired record regardless of fingerprint equality.
    ForceResync,
}

type TriggerMap = Arc<RwLock<HashMap<String, mpsc::Sender<Trigger>>>>;

/// Drives periodic reconciliation across all registered providers.
pub struct Scheduler {
    ctx: Arc<EngineContext>,
    reconciler: Arc<Reconciler>,
    aggregator: Arc<HostnameAggregator>,
    triggers: TriggerMap,
    /// Per-provider tick overrides (falls back to the config interval).
    interval_overrides: HashMap<String, std::time::Duration>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        ctx: Arc<EngineContext>,
        reconciler: Arc<Reconciler>,
        aggregator: Arc<HostnameAggregator>,
    ) -> Self {
        Self {
            ctx,
            reconciler,
            aggregator,
            triggers: Arc::new(RwLock::new(HashMap::new())),
            interval_overrides: HashMap::new(),
        }
    }

    /// Override the tick interval for one provider.
    #[must_use]
    pub fn with_interval(mut self, provider_id: impl Into<String>, interval: std::time::Duration) -> Self {
        self.interval_overrides.insert(provider_id.into(), interval);
        self
    }

    /// A cloneable handle for triggers and admin operations.
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            ctx: self.ctx.clone(),
            reconciler: self.reconciler.clone(),
            aggregator: self.aggregator.clone(),
            triggers: self.triggers.clone(),
        }
    }

    /// Spawn one worker per registered provider and run until the
    /// shutdown signal flips. Resolves once every worker has stopped.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let provider_ids = self.ctx.registry.list_provider_ids().await;
        log::info!("scheduler starting for {} provider(s)", provider_ids.len());

        let mut workers = Vec::new();
        for provider_id in provider_ids {
            let (tx, rx) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);
            self.triggers.write().await.insert(provider_id.clone(), tx);

            let interval = self
                .interval_overrides
                .get(&provider_id)
                .copied()
                .unwrap_or_else(|| self.ctx.config.reconcile_interval());

            workers.push(tokio::spawn(provider_worker(
                provider_id,
                self.ctx.clone(),
                self.reconciler.clone(),
                self.aggregator.clone(),
                rx,
                shutdown.clone(),
                interval,
            )));
        }

        for worker in workers {
            let _ = worker.await;
        }
        log::info!("scheduler stopped");
    }
}

/// The per-provider reconciliation loop.
async fn provider_worker(
    provider_id: String,
    ctx: Arc<EngineContext>,
    reconciler: Arc<Reconciler>,
    aggregator: Arc<HostnameAggregator>,
    mut triggers: mpsc::Receiver<Trigger>,
    mut shutdown: watch::Receiver<bool>,
    interval: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let force = tokio::select! {
            _ = ticker.tick() => false,
            maybe = triggers.recv() => {
                let Some(first) = maybe else { break };
                // Debounce: give the burst a moment to finish, then
                // drain whatever accumulated into this one cycle.
                tokio::select! {
                    () = tokio::time::sleep(ctx.config.debounce_window()) => {}
                    _ = shutdown.changed() => break,
                }
                let mut force = first == Trigger::ForceResync;
                while let Ok(more) = triggers.try_recv() {
                    force |= more == Trigger::ForceResync;
                }
                force
            }
            _ = shutdown.changed() => break,
        };

        // The cycle itself races shutdown: dropping the future cancels
        // in-flight requests; per-operation store commits keep the next
        // run consistent.
        tokio::select! {
            () = run_cycle(&provider_id, &reconciler, &aggregator, force) => {}
            _ = shutdown.changed() => break,
        }
    }

    log::debug!("[{provider_id}] worker stopped");
}

async fn run_cycle(
    provider_id: &str,
    reconciler: &Reconciler,
    aggregator: &HostnameAggregator,
    force: bool,
) {
    let desired_set = match aggregator.desired_set().await {
        Ok(set) => set,
        Err(e) => {
            log::error!("[{provider_id}] aggregation failed, cycle skipped: {e}");
            return;
        }
    };
    log_rejections(&desired_set);

    let desired = desired_set.for_provider(provider_id);
    match reconciler
        .reconcile_at(provider_id, &desired, Utc::now(), force)
        .await
    {
        Ok(result) if result.dry_run => {
            log::info!("[{provider_id}] paused; dry-run plan recorded");
        }
        Ok(result) => {
            if !result.applied.is_empty() {
                log::info!(
                    "[{provider_id}] cycle done: {} ok, {} failed",
                    result.succeeded(),
                    result.failed()
                );
            }
        }
        Err(e) if e.is_expected() => log::warn!("[{provider_id}] cycle skipped: {e}"),
        Err(e) => log::error!("[{provider_id}] cycle failed: {e}"),
    }
}

fn log_rejections(set: &DesiredSet) {
    for rejected in &set.rejected {
        log::warn!(
            "[{}] conflicting desired contents for {}: {:?}; key excluded",
            rejected.provider_id,
            rejected.key,
            rejected.values
        );
    }
}

/// Cloneable admin/control handle over the engine: forced cycles,
/// dry-runs, pause/resume, orphan listing, claim/release.
#[derive(Clone)]
pub struct EngineHandle {
    ctx: Arc<EngineContext>,
    reconciler: Arc<Reconciler>,
    aggregator: Arc<HostnameAggregator>,
    triggers: TriggerMap,
}

impl EngineHandle {
    /// Nudge one provider (or all) to reconcile soon; coalesced by the
    /// debounce window.
    pub async fn trigger(&self, provider_id: Option<&str>, trigger: Trigger) {
        let txs = self.triggers.read().await;
        match provider_id {
            Some(id) => {
                if let Some(tx) = txs.get(id) {
                    let _ = tx.try_send(trigger);
                }
            }
            None => {
                for tx in txs.values() {
                    let _ = tx.try_send(trigger);
                }
            }
        }
    }

    /// Force one reconciliation cycle now and return its result.
    ///
    /// Returns [`EngineError::ReconcileInProgress`] (after nudging the
    /// running worker) when a cycle already holds the provider lock.
    pub async fn reconcile_now(&self, provider_id: &str) -> EngineResult<PlanResult> {
        self.run_once(provider_id, false).await
    }

    /// Forced full resync: every desired record is re-applied regardless
    /// of fingerprint equality. Useful after changing provider defaults.
    pub async fn force_resync(&self, provider_id: &str) -> EngineResult<PlanResult> {
        self.run_once(provider_id, true).await
    }

    async fn run_once(&self, provider_id: &str, force: bool) -> EngineResult<PlanResult> {
        let desired_set = self.aggregator.desired_set().await?;
        log_rejections(&desired_set);
        let desired = desired_set.for_provider(provider_id);
        let result = self
            .reconciler
            .try_reconcile_at(provider_id, &desired, Utc::now(), force)
            .await;

        if matches!(&result, Err(EngineError::ReconcileInProgress(_))) {
            // Fold the request into the in-flight cycle's follow-up.
            self.trigger(
                Some(provider_id),
                if force {
                    Trigger::ForceResync
                } else {
                    Trigger::DesiredChanged
                },
            )
            .await;
        }
        result
    }

    /// Compute a plan without side effects on the provider.
    pub async fn dry_run(&self, provider_id: &str) -> EngineResult<Plan> {
        let desired_set = self.aggregator.desired_set().await?;
        let desired = desired_set.for_provider(provider_id);
        self.reconciler
            .dry_run(provider_id, &desired, Utc::now())
            .await
    }

    /// The most recent plan computed for a provider.
    pub async fn last_plan(&self, provider_id: &str) -> Option<Plan> {
        self.ctx.last_plan(provider_id).await
    }

    pub async fn pause(&self, provider_id: &str) {
        self.ctx.pause(provider_id).await;
    }

    pub async fn resume(&self, provider_id: &str) {
        self.ctx.resume(provider_id).await;
        self.trigger(Some(provider_id), Trigger::DesiredChanged).await;
    }

    /// Managed records currently in orphan state.
    pub async fn list_orphans(&self, provider_id: &str) -> EngineResult<Vec<ManagedRecord>> {
        self.ctx.managed.list_orphaned(provider_id).await
    }

    /// Claim a discovered record: the engine becomes authoritative for it.
    pub async fn claim(&self, provider_id: &str, external_id: &str) -> EngineResult<()> {
        if let Some(existing) = self
            .ctx
            .managed
            .find_by_external_id(provider_id, external_id)
            .await?
        {
            if !existing.managed {
                self.ctx
                    .managed
                    .set_managed(provider_id, external_id, true)
                    .await?;
            }
            return Ok(());
        }

        let cached: Option<CachedRecord> = self
            .ctx
            .cache
            .find_by_external_id(provider_id, external_id)
            .await?;
        let Some(cached) = cached else {
            return Err(EngineError::RecordNotFound(format!(
                "{provider_id}/{external_id}"
            )));
        };

        self.ctx
            .managed
            .track(ManagedRecord::track_new(
                provider_id,
                external_id,
                cached.record,
                RecordSource::Imported,
                true,
                Utc::now(),
            ))
            .await?;
        log::info!("[{provider_id}] record {external_id} claimed");
        Ok(())
    }

    /// Release a managed record: it stays tracked but is never mutated
    /// again until re-claimed.
    pub async fn release(&self, provider_id: &str, external_id: &str) -> EngineResult<()> {
        if self
            .ctx
            .managed
            .find_by_external_id(provider_id, external_id)
            .await?
            .is_none()
        {
            return Err(EngineError::RecordNotFound(format!(
                "{provider_id}/{external_id}"
            )));
        }
        self.ctx
            .managed
            .set_managed(provider_id, external_id, false)
            .await?;
        log::info!("[{provider_id}] record {external_id} released");
        Ok(())
    }
}
