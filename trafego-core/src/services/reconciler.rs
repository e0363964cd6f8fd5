//! The reconciler: compares desired state against the provider cache and
//! the managed store, computes a minimal operation plan, and applies it.
//!
//! Per provider the cycle is: refresh gate → plan (including the orphan
//! sweep deletes that fell due) → apply → orphan mark/unmark post-pass.
//! Application order is deletes, then updates, then creates, each group
//! in lexicographic `(name, type)` order, with at most
//! `max_inflight_ops` operations against the provider at once. Every
//! operation is independent: one failure never aborts the plan, and the
//! managed store is updated per successful operation so a crash mid-plan
//! cannot desynchronize the next run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use trafego_provider::{
    fingerprint, AdapterError, Capabilities, DnsAdapter, Record, RecordKey, RecordKind,
};

use crate::error::{EngineError, EngineResult};
use crate::services::{EngineContext, OrphanDetector};
use crate::types::{
    AppliedOp, CachedRecord, DesiredRecord, ManagedRecord, OpOutcome, Plan, PlanOp, PlanResult,
    RecordSource, SkippedKey,
};

/// Compares desired vs. provider vs. managed state and converges them.
pub struct Reconciler {
    ctx: Arc<EngineContext>,
    orphans: OrphanDetector,
}

impl Reconciler {
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        let orphans = OrphanDetector::new(ctx.clone());
        Self { ctx, orphans }
    }

    /// Run one full reconciliation cycle for a provider, serializing
    /// with any other cycle for the same provider.
    pub async fn reconcile(
        &self,
        provider_id: &str,
        desired: &[DesiredRecord],
    ) -> EngineResult<PlanResult> {
        self.reconcile_at(provider_id, desired, Utc::now(), false)
            .await
    }

    /// [`reconcile`](Self::reconcile) with an explicit clock and the
    /// forced-resync switch (skip fingerprint equality, treat every
    /// match as an update).
    pub async fn reconcile_at(
        &self,
        provider_id: &str,
        desired: &[DesiredRecord],
        now: DateTime<Utc>,
        force: bool,
    ) -> EngineResult<PlanResult> {
        let lock = self.ctx.provider_lock(provider_id).await;
        let _guard = lock.lock().await;
        self.reconcile_locked(provider_id, desired, now, force)
            .await
    }

    /// Like [`reconcile_at`](Self::reconcile_at), but returns
    /// immediately with [`EngineError::ReconcileInProgress`] when a
    /// cycle is already running for this provider.
    pub async fn try_reconcile_at(
        &self,
        provider_id: &str,
        desired: &[DesiredRecord],
        now: DateTime<Utc>,
        force: bool,
    ) -> EngineResult<PlanResult> {
        let lock = self.ctx.provider_lock(provider_id).await;
        let Ok(_guard) = lock.try_lock() else {
            return Err(EngineError::ReconcileInProgress(provider_id.to_string()));
        };
        self.reconcile_locked(provider_id, desired, now, force)
            .await
    }

    async fn reconcile_locked(
        &self,
        provider_id: &str,
        desired: &[DesiredRecord],
        now: DateTime<Utc>,
        force: bool,
    ) -> EngineResult<PlanResult> {
        let adapter = self.ctx.adapter(provider_id).await?;

        self.refresh_gate(provider_id, adapter.as_ref(), now).await?;

        let plan = self
            .build_plan(provider_id, adapter.as_ref(), desired, now, force)
            .await?;
        self.ctx.store_last_plan(plan.clone()).await;

        if self.ctx.is_paused(provider_id).await {
            log::info!(
                "[{provider_id}] paused; holding plan with {} operation(s) as dry-run",
                plan.operations.len()
            );
            return Ok(PlanResult {
                provider_id: provider_id.to_string(),
                applied: Vec::new(),
                skipped: plan.skipped,
                dry_run: true,
            });
        }

        let result = self.apply_plan(provider_id, adapter.as_ref(), plan, now).await?;

        let desired_keys: HashSet<RecordKey> = desired.iter().map(DesiredRecord::key).collect();
        self.orphans.post_pass(provider_id, &desired_keys, now).await?;

        Ok(result)
    }

    /// Compute a plan without applying it (and without the orphan
    /// post-pass). The provider cache is still refreshed when stale so
    /// the plan reflects reality; the provider itself is never mutated.
    pub async fn dry_run(
        &self,
        provider_id: &str,
        desired: &[DesiredRecord],
        now: DateTime<Utc>,
    ) -> EngineResult<Plan> {
        let adapter = self.ctx.adapter(provider_id).await?;
        self.refresh_gate(provider_id, adapter.as_ref(), now).await?;
        let plan = self
            .build_plan(provider_id, adapter.as_ref(), desired, now, false)
            .await?;
        self.ctx.store_last_plan(plan.clone()).await;
        Ok(plan)
    }

    /// Refresh the provider cache when it is stale or empty. Failure
    /// here aborts the cycle without mutating state.
    async fn refresh_gate(
        &self,
        provider_id: &str,
        adapter: &dyn DnsAdapter,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let stale = match self.ctx.cache.last_refreshed_at(provider_id).await? {
            None => true,
            Some(at) => at < now - self.ctx.config.cache_ttl(),
        };
        if !stale {
            return Ok(());
        }

        let listed = adapter.list_records(None).await.map_err(|e| {
            if e.is_transient() {
                EngineError::ProviderUnreachable {
                    provider_id: provider_id.to_string(),
                    detail: e.to_string(),
                }
            } else {
                EngineError::Adapter(e)
            }
        })?;

        let rows: Vec<CachedRecord> = listed
            .into_iter()
            .map(|r| CachedRecord::from_listing(provider_id, r, now))
            .collect();
        let count = rows.len();
        self.ctx.cache.replace_all(provider_id, rows).await?;
        log::debug!("[{provider_id}] provider cache refreshed ({count} records)");
        Ok(())
    }

    /// Classify every `(type, name)` key and produce the ordered plan.
    async fn build_plan(
        &self,
        provider_id: &str,
        adapter: &dyn DnsAdapter,
        desired: &[DesiredRecord],
        now: DateTime<Utc>,
        force: bool,
    ) -> EngineResult<Plan> {
        let caps = adapter.capabilities();
        let marker = adapter.ownership_marker();

        // D: desired records, unique per key.
        let mut d: HashMap<RecordKey, &DesiredRecord> = HashMap::new();
        for dr in desired {
            if d.insert(dr.key(), dr).is_some() {
                return Err(EngineError::InvalidDesiredState(format!(
                    "duplicate desired record for {}",
                    dr.key()
                )));
            }
        }

        // P: provider cache, possibly several rows per key on
        // multi-value providers.
        let cached = self.ctx.cache.list(provider_id).await?;
        let mut p: HashMap<RecordKey, Vec<&CachedRecord>> = HashMap::new();
        for row in &cached {
            p.entry(row.key()).or_default().push(row);
        }

        // M: managed rows. Live, owned rows take part in the update/no-op
        // classification; orphaned-but-still-managed rows keep a key index
        // of their own so a reappearing key is recognized as ours rather
        // than as a foreign conflict. The full external-id index guards
        // against re-claiming rows we already track (released rows stay
        // hands-off).
        let managed_rows = self.ctx.managed.list(provider_id).await?;
        let mut m_live: HashMap<RecordKey, &ManagedRecord> = HashMap::new();
        let mut m_orphaned_by_key: HashMap<RecordKey, &ManagedRecord> = HashMap::new();
        let mut m_by_external: HashMap<&str, &ManagedRecord> = HashMap::new();
        let mut m_orphaned: Vec<&ManagedRecord> = Vec::new();
        for row in &managed_rows {
            m_by_external.insert(row.external_id.as_str(), row);
            if row.is_orphaned {
                m_orphaned.push(row);
                if row.managed {
                    m_orphaned_by_key.insert(row.key(), row);
                }
            } else if row.managed {
                m_live.insert(row.key(), row);
            }
        }

        let mut claims: Vec<PlanOp> = Vec::new();
        let mut deletes: Vec<PlanOp> = Vec::new();
        let mut updates: Vec<PlanOp> = Vec::new();
        let mut creates: Vec<PlanOp> = Vec::new();
        let mut skipped: Vec<SkippedKey> = Vec::new();

        // Orphan sweep: orphans past the grace window whose key has not
        // come back. These deletes lead the plan.
        let orphan_rows: Vec<ManagedRecord> = m_orphaned.iter().map(|r| (*r).clone()).collect();
        let desired_keys: HashSet<RecordKey> = d.keys().cloned().collect();
        for row in OrphanDetector::sweepable(
            &orphan_rows,
            &desired_keys,
            now,
            self.ctx.config.grace_window(),
        ) {
            deletes.push(PlanOp::Delete {
                external_id: row.external_id.clone(),
                key: row.key(),
            });
        }

        // Desired keys: create, update, claim, or skip.
        for (key, &dr) in &d {
            let p_rows = p.get(key);
            let prepared = prepare_record(dr, p_rows, &caps, marker, adapter);

            // An orphaned row whose record still exists at the provider
            // counts as ours again once its key reappears; if the record
            // is gone externally, the key falls through to the create or
            // conflict paths instead.
            let revived = m_orphaned_by_key.get(key).copied().filter(|row| {
                p_rows.is_some_and(|rows| {
                    rows.iter().any(|r| r.external_id == row.external_id)
                })
            });
            let owned_row = m_live.get(key).copied().or(revived);

            match (p_rows, owned_row) {
                // Not at the provider: create. This also covers
                // missing-from-provider (a managed row exists but the
                // record vanished externally); apply rebinds the
                // existing row to the new external id.
                (None, _) => creates.push(PlanOp::Create { record: prepared }),

                // At the provider and ours: update on drift (or always,
                // under forced resync).
                (Some(rows), Some(m_row)) => {
                    let p_row = rows
                        .iter()
                        .find(|r| r.external_id == m_row.external_id)
                        .or_else(|| rows.first())
                        .copied();
                    // A reappearing orphan leaves orphan state up front,
                    // not a cycle later, and regardless of whether the
                    // content update below succeeds.
                    if m_row.is_orphaned {
                        let record =
                            p_row.map_or_else(|| m_row.record.clone(), |r| r.record.clone());
                        claims.push(PlanOp::Claim {
                            external_id: m_row.external_id.clone(),
                            record,
                            source: m_row.source,
                        });
                    }
                    if let Some(p_row) = p_row {
                        if force || fingerprint(&prepared) != p_row.fingerprint {
                            updates.push(PlanOp::Update {
                                external_id: p_row.external_id.clone(),
                                record: prepared,
                            });
                        }
                    }
                }

                // At the provider but not ours: conflict pre-check.
                (Some(rows), None) => {
                    let same_content = rows
                        .iter()
                        .find(|r| r.record.content() == prepared.content());
                    if let Some(existing) = same_content {
                        if m_by_external.contains_key(existing.external_id.as_str()) {
                            // Tracked but released: hands off.
                            continue;
                        }
                        // Same target already exists: claim it instead of
                        // duplicating.
                        claims.push(PlanOp::Claim {
                            external_id: existing.external_id.clone(),
                            record: existing.record.clone(),
                            source: RecordSource::Imported,
                        });
                        if force || fingerprint(&prepared) != existing.fingerprint {
                            updates.push(PlanOp::Update {
                                external_id: existing.external_id.clone(),
                                record: prepared,
                            });
                        }
                    } else if let Some(marked) = rows
                        .iter()
                        .find(|r| r.record.has_ownership_marker())
                        .filter(|r| !m_by_external.contains_key(r.external_id.as_str()))
                    {
                        // Carries our marker from a previous life:
                        // re-claim and converge its content.
                        claims.push(PlanOp::Claim {
                            external_id: marked.external_id.clone(),
                            record: marked.record.clone(),
                            source: RecordSource::Imported,
                        });
                        updates.push(PlanOp::Update {
                            external_id: marked.external_id.clone(),
                            record: prepared,
                        });
                    } else if key.kind == RecordKind::A && caps.multi_value_a {
                        // Foreign record with different content, but the
                        // provider supports multiple A values.
                        creates.push(PlanOp::Create { record: prepared });
                    } else {
                        skipped.push(SkippedKey {
                            key: key.clone(),
                            reason: format!(
                                "conflicting record exists at provider with content '{}'",
                                rows.first().map_or("", |r| r.record.content())
                            ),
                        });
                    }
                }
            }
        }

        // Provider records outside the desired set: self-heal marker
        // imports. Everything else unmanaged is left strictly alone.
        if marker.is_some() {
            for row in &cached {
                if d.contains_key(&row.key()) || m_by_external.contains_key(row.external_id.as_str())
                {
                    continue;
                }
                if row.record.has_ownership_marker() {
                    log::info!(
                        "[{provider_id}] found ownership marker on untracked record '{}', importing",
                        row.key()
                    );
                    claims.push(PlanOp::Claim {
                        external_id: row.external_id.clone(),
                        record: row.record.clone(),
                        source: RecordSource::Imported,
                    });
                }
            }
        }

        for group in [&mut claims, &mut deletes, &mut updates, &mut creates] {
            group.sort_by_key(PlanOp::sort_key);
        }

        let mut operations = claims;
        operations.append(&mut deletes);
        operations.append(&mut updates);
        operations.append(&mut creates);

        Ok(Plan {
            provider_id: provider_id.to_string(),
            operations,
            skipped,
        })
    }

    /// Apply a plan with bounded intra-provider concurrency, updating
    /// the managed store and cache per successful operation.
    async fn apply_plan(
        &self,
        provider_id: &str,
        adapter: &dyn DnsAdapter,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> EngineResult<PlanResult> {
        let mut applied: Vec<AppliedOp> = Vec::with_capacity(plan.operations.len());

        // Claims are store-only and cheap: run them serially first.
        let (claims, provider_ops): (Vec<_>, Vec<_>) = plan
            .operations
            .into_iter()
            .partition(|op| !op.mutates_provider());

        for op in claims {
            let outcome = match &op {
                PlanOp::Claim {
                    external_id,
                    record,
                    source,
                } => self
                    .apply_claim(provider_id, external_id, record, *source, now)
                    .await
                    .map(|()| OpOutcome::Succeeded),
                _ => unreachable!("partition keeps only store-only ops here"),
            };
            match outcome {
                Ok(outcome) => applied.push(AppliedOp { op, outcome }),
                Err(e) => return Err(e),
            }
        }

        // Provider-mutating ops, grouped in order, chunked to the
        // in-flight bound. Chunk results are collected in submission
        // order, keeping the overall application order deterministic.
        for chunk in provider_ops.chunks(self.ctx.config.max_inflight_ops.max(1)) {
            let futures: Vec<_> = chunk
                .iter()
                .map(|op| self.apply_provider_op(provider_id, adapter, op, now))
                .collect();
            let outcomes = futures::future::join_all(futures).await;
            for (op, outcome) in chunk.iter().cloned().zip(outcomes) {
                match &outcome {
                    OpOutcome::Succeeded => {}
                    OpOutcome::FailedTransient { error } => {
                        log::warn!("[{provider_id}] {op:?} failed (will retry next cycle): {error}");
                    }
                    OpOutcome::FailedPermanent { error } => {
                        log::error!("[{provider_id}] {op:?} failed permanently: {error}");
                    }
                }
                applied.push(AppliedOp { op, outcome });
            }
        }

        let result = PlanResult {
            provider_id: provider_id.to_string(),
            applied,
            skipped: plan.skipped,
            dry_run: false,
        };
        log::info!(
            "[{provider_id}] plan applied: {} succeeded, {} failed, {} skipped",
            result.succeeded(),
            result.failed(),
            result.skipped.len()
        );
        Ok(result)
    }

    /// Import an existing provider record into the managed store.
    async fn apply_claim(
        &self,
        provider_id: &str,
        external_id: &str,
        record: &Record,
        source: RecordSource,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let existing = self
            .ctx
            .managed
            .find_by_external_id(provider_id, external_id)
            .await?;

        let row = match existing {
            Some(mut prev) => {
                prev.record = record.clone();
                prev.fingerprint = fingerprint(record);
                prev.managed = true;
                prev.is_orphaned = false;
                prev.orphaned_at = None;
                prev.updated_at = now;
                prev
            }
            None => ManagedRecord::track_new(provider_id, external_id, record.clone(), source, true, now),
        };
        self.ctx.managed.track(row).await
    }

    /// Execute one provider-mutating operation and commit its result to
    /// the stores. Infallible at the type level: failures become the
    /// operation's outcome.
    async fn apply_provider_op(
        &self,
        provider_id: &str,
        adapter: &dyn DnsAdapter,
        op: &PlanOp,
        now: DateTime<Utc>,
    ) -> OpOutcome {
        let result = match op {
            PlanOp::Delete { external_id, .. } => {
                self.apply_delete(provider_id, adapter, external_id).await
            }
            PlanOp::Update {
                external_id,
                record,
            } => {
                self.apply_update(provider_id, adapter, external_id, record, now)
                    .await
            }
            PlanOp::Create { record } => {
                self.apply_create(provider_id, adapter, record, now).await
            }
            PlanOp::Claim { .. } => unreachable!("claims are applied separately"),
        };

        match result {
            Ok(()) => OpOutcome::Succeeded,
            Err(EngineError::Adapter(e)) => OpOutcome::from_error(e),
            Err(e) => OpOutcome::FailedTransient {
                error: AdapterError::Unknown {
                    provider: provider_id.to_string(),
                    raw_code: None,
                    raw_message: e.to_string(),
                },
            },
        }
    }

    async fn apply_delete(
        &self,
        provider_id: &str,
        adapter: &dyn DnsAdapter,
        external_id: &str,
    ) -> EngineResult<()> {
        adapter.delete_record(external_id).await?;
        self.ctx.managed.untrack(provider_id, external_id).await?;
        self.ctx.cache.remove(provider_id, external_id).await?;
        Ok(())
    }

    async fn apply_update(
        &self,
        provider_id: &str,
        adapter: &dyn DnsAdapter,
        external_id: &str,
        record: &Record,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let written = adapter.update_record(external_id, record).await?;

        // Providers may regenerate the id on edit.
        if written.external_id != external_id {
            self.ctx
                .managed
                .rebind_external_id(provider_id, &record.key(), &written.external_id, now)
                .await?;
            self.ctx.cache.remove(provider_id, external_id).await?;
        }

        self.commit_written(provider_id, written, RecordSource::Managed, now)
            .await
    }

    async fn apply_create(
        &self,
        provider_id: &str,
        adapter: &dyn DnsAdapter,
        record: &Record,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let written = adapter.create_record(record).await?;

        // A managed row may already exist for this key: a record that
        // vanished at the provider, or an orphan being revived. Rebind
        // it to the fresh external id instead of growing a second row.
        if let Some(prev) = self
            .ctx
            .managed
            .find_by_key(provider_id, &record.key())
            .await?
        {
            if prev.external_id != written.external_id {
                self.ctx
                    .managed
                    .rebind_external_id(provider_id, &record.key(), &written.external_id, now)
                    .await?;
            }
        }

        self.commit_written(provider_id, written, RecordSource::Managed, now)
            .await
    }

    /// Upsert the managed row and cache row for a record the provider
    /// just confirmed.
    async fn commit_written(
        &self,
        provider_id: &str,
        written: trafego_provider::ProviderRecord,
        source: RecordSource,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let existing = self
            .ctx
            .managed
            .find_by_external_id(provider_id, &written.external_id)
            .await?;

        let row = match existing {
            Some(mut prev) => {
                prev.record = written.record.clone();
                prev.fingerprint = fingerprint(&written.record);
                prev.is_orphaned = false;
                prev.orphaned_at = None;
                prev.updated_at = now;
                prev
            }
            None => ManagedRecord::track_new(
                provider_id,
                written.external_id.clone(),
                written.record.clone(),
                source,
                true,
                now,
            ),
        };
        self.ctx.managed.track(row).await?;

        self.ctx
            .cache
            .upsert(CachedRecord::from_listing(provider_id, written, now))
            .await
    }
}

/// Materialize the record the engine intends to write for one desired
/// entry: provider defaults applied, proxy flag trimmed to capability,
/// ownership marker attached where the provider can carry it.
fn prepare_record(
    desired: &DesiredRecord,
    p_rows: Option<&Vec<&CachedRecord>>,
    caps: &Capabilities,
    marker: Option<&'static str>,
    adapter: &dyn DnsAdapter,
) -> Record {
    let mut record = desired.record.clone();

    // TTL 0 means "no opinion": fall back to the instance default, then
    // to whatever the provider currently has for this key.
    if record.ttl == 0 {
        let default_ttl = adapter.settings().default_ttl;
        if default_ttl > 0 {
            record.ttl = default_ttl;
        } else if let Some(existing) = p_rows.and_then(|rows| rows.first()) {
            record.ttl = existing.record.ttl;
        }
    }

    // Same "no opinion" rule for the proxy flag: instance default first,
    // then whatever the provider already has, so an unspecified flag
    // never churns an existing record.
    if caps.proxying {
        if record.proxied.is_none() && record.kind().admits_proxying() {
            record.proxied = adapter.settings().default_proxied.or_else(|| {
                p_rows
                    .and_then(|rows| rows.first())
                    .and_then(|existing| existing.record.proxied)
            });
        }
    } else {
        record.proxied = None;
    }

    if let Some(marker) = marker {
        record.comment = match record.comment.take() {
            Some(c) if c.contains(marker) => Some(c),
            Some(c) => Some(format!("{c} {marker}")),
            None => Some(marker.to_string()),
        };
    } else {
        record.comment = None;
    }

    record
}
