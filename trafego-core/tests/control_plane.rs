//! Control-plane behavior: single-writer, provider isolation,
//! pause/resume, claim/release, and scheduler triggering.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{a_record, desired_a, t0, Harness};
use trafego_core::services::{EngineHandle, HostnameAggregator, Scheduler, Trigger};
use trafego_core::traits::HostnameSource;
use trafego_core::types::DesiredRecord;
use trafego_core::{EngineError, EngineResult};
use trafego_provider::AdapterError;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};

/// A hostname source whose snapshot can be swapped at runtime.
struct SwappableSource {
    records: RwLock<Vec<DesiredRecord>>,
}

impl SwappableSource {
    fn new(records: Vec<DesiredRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(records),
        })
    }

    async fn set(&self, records: Vec<DesiredRecord>) {
        *self.records.write().await = records;
    }
}

#[async_trait]
impl HostnameSource for SwappableSource {
    fn name(&self) -> &str {
        "swappable"
    }

    async fn snapshot(&self) -> EngineResult<Vec<DesiredRecord>> {
        Ok(self.records.read().await.clone())
    }
}

fn handle_for(h: &Harness, source: Arc<SwappableSource>, default_provider: &str) -> EngineHandle {
    let aggregator = Arc::new(HostnameAggregator::new(
        vec![source],
        h.ctx.overrides.clone(),
        Some(default_provider.to_string()),
    ));
    Scheduler::new(h.ctx.clone(), h.reconciler.clone(), aggregator).handle()
}

/// Concurrent reconciliations for one provider serialize;
/// the loser returns immediately.
#[tokio::test]
async fn single_writer_per_provider() {
    let h = Harness::new().await;
    let adapter = h.add_provider("p1").await;
    adapter.set_latency(Duration::from_millis(200)).await;

    let desired = vec![desired_a("app.example.com", "1.2.3.4", 300)];

    let slow = {
        let reconciler = h.reconciler.clone();
        let desired = desired.clone();
        tokio::spawn(async move { reconciler.reconcile_at("p1", &desired, t0(), false).await })
    };

    // Give the first cycle time to take the provider lock.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let busy = h
        .reconciler
        .try_reconcile_at("p1", &desired, t0(), false)
        .await;
    assert!(
        matches!(busy, Err(EngineError::ReconcileInProgress(ref id)) if id == "p1"),
        "unexpected result: {busy:?}"
    );

    let result = slow.await.unwrap().unwrap();
    assert_eq!(result.succeeded(), 1);
}

/// An unreachable provider does not delay or alter another
/// provider's cycle.
#[tokio::test]
async fn provider_isolation_under_failure() {
    let h = Harness::new().await;
    let broken = h.add_provider("p1").await;
    let healthy = h.add_provider("p2").await;

    broken
        .set_fail(Some(AdapterError::Unreachable {
            provider: "mock".to_string(),
            detail: "blackhole".to_string(),
        }))
        .await;

    let d1 = vec![desired_a("one.example.com", "1.1.1.1", 300)];
    let d2 = vec![desired_a("two.example.com", "2.2.2.2", 300)];

    let (r1, r2) = tokio::join!(
        h.reconciler.reconcile_at("p1", &d1, t0(), false),
        h.reconciler.reconcile_at("p2", &d2, t0(), false),
    );

    assert!(
        matches!(r1, Err(EngineError::ProviderUnreachable { ref provider_id, .. }) if provider_id == "p1"),
        "unexpected result: {r1:?}"
    );
    let r2 = r2.unwrap();
    assert_eq!(r2.succeeded(), 1);
    assert_eq!(healthy.record_count().await, 1);

    // The failed provider's stores were never touched.
    assert!(h.ctx.managed.list("p1").await.unwrap().is_empty());
    assert!(h.ctx.cache.list("p1").await.unwrap().is_empty());
}

/// Pause computes plans but applies nothing; resume converges.
#[tokio::test]
async fn pause_holds_plan_as_dry_run() {
    let h = Harness::new().await;
    let adapter = h.add_provider("p1").await;

    h.ctx.pause("p1").await;

    let desired = vec![desired_a("app.example.com", "1.2.3.4", 300)];
    let result = h
        .reconciler
        .reconcile_at("p1", &desired, t0(), false)
        .await
        .unwrap();

    assert!(result.dry_run);
    assert!(result.applied.is_empty());
    assert_eq!(adapter.calls_mentioning("create").await, 0);
    assert!(h.ctx.managed.list("p1").await.unwrap().is_empty());

    // The plan is retained for inspection.
    let plan = h.ctx.last_plan("p1").await.unwrap();
    assert_eq!(plan.operations.len(), 1);

    h.ctx.resume("p1").await;
    let result = h
        .reconciler
        .reconcile_at("p1", &desired, t0() + chrono::Duration::minutes(5), false)
        .await
        .unwrap();
    assert_eq!(result.succeeded(), 1);
    assert_eq!(adapter.record_count().await, 1);
}

/// Orphans are never marked while a provider is paused (nothing is
/// applied, including the post-pass).
#[tokio::test]
async fn dry_run_plan_has_no_side_effects() {
    let h = Harness::new().await;
    let adapter = h.add_provider("p1").await;
    adapter.seed(a_record("app.example.com", "9.9.9.9", 300)).await;

    let desired = vec![desired_a("app.example.com", "1.2.3.4", 300)];
    let plan = h
        .reconciler
        .dry_run("p1", &desired, t0())
        .await
        .unwrap();

    assert!(!plan.is_empty());
    // Only the refresh listing hit the provider.
    let calls = adapter.call_log().await;
    assert!(calls.iter().all(|c| c == "list"), "calls: {calls:?}");
    assert!(h.ctx.managed.list("p1").await.unwrap().is_empty());
}

/// claim() imports a cached discovered record; release() stops the
/// engine from ever mutating it again.
#[tokio::test]
async fn claim_and_release_toggle_ownership() {
    let h = Harness::new().await;
    let adapter = h.add_provider("p1").await;
    let source = SwappableSource::new(vec![]);
    let handle = handle_for(&h, source.clone(), "p1");

    let external_id = adapter.seed(a_record("legacy.example.com", "9.9.9.9", 300)).await;

    // Populate the cache so claim can find the record.
    h.reconciler.reconcile_at("p1", &[], t0(), false).await.unwrap();

    handle.claim("p1", &external_id).await.unwrap();
    let row = h
        .ctx
        .managed
        .find_by_external_id("p1", &external_id)
        .await
        .unwrap()
        .unwrap();
    assert!(row.managed);

    handle.release("p1", &external_id).await.unwrap();
    let row = h
        .ctx
        .managed
        .find_by_external_id("p1", &external_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!row.managed);

    // Released: a desired record for the same key must not update it.
    source
        .set(vec![desired_a("legacy.example.com", "1.2.3.4", 300)])
        .await;
    let result = handle.reconcile_now("p1").await.unwrap();
    assert!(
        result
            .applied
            .iter()
            .all(|a| !matches!(a.op, trafego_core::types::PlanOp::Update { .. })),
        "released record must not be updated: {result:?}"
    );
    assert_eq!(
        adapter.record_by_id(&external_id).await.unwrap().content(),
        "9.9.9.9"
    );
}

#[tokio::test]
async fn claim_unknown_record_fails() {
    let h = Harness::new().await;
    h.add_provider("p1").await;
    let handle = handle_for(&h, SwappableSource::new(vec![]), "p1");

    let res = handle.claim("p1", "no-such-id").await;
    assert!(
        matches!(res, Err(EngineError::RecordNotFound(_))),
        "unexpected result: {res:?}"
    );
}

/// list_orphans surfaces exactly the orphaned rows.
#[tokio::test]
async fn list_orphans_reports_marked_rows() {
    let h = Harness::new().await;
    h.add_provider("p1").await;
    let source = SwappableSource::new(vec![desired_a("app.example.com", "1.2.3.4", 300)]);
    let handle = handle_for(&h, source.clone(), "p1");

    h.reconciler
        .reconcile_at(
            "p1",
            &[desired_a("app.example.com", "1.2.3.4", 300)],
            t0(),
            false,
        )
        .await
        .unwrap();
    assert!(handle.list_orphans("p1").await.unwrap().is_empty());

    // Hostname goes away; next cycle marks it.
    h.reconciler
        .reconcile_at("p1", &[], t0() + chrono::Duration::minutes(5), false)
        .await
        .unwrap();
    let orphans = handle.list_orphans("p1").await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].record.name, "app.example.com");
}

/// The scheduler reconciles on startup and again when triggered, with
/// the debounce window coalescing a burst into one cycle.
#[tokio::test]
async fn scheduler_runs_and_debounces_triggers() {
    // cache_ttl 0 forces a listing per cycle, making cycles countable.
    let h = Harness::with_config(trafego_core::EngineConfig {
        debounce_window_ms: 50,
        cache_ttl_secs: 0,
        ..Default::default()
    })
    .await;
    let adapter = h.add_provider("p1").await;

    let source = SwappableSource::new(vec![desired_a("app.example.com", "1.2.3.4", 300)]);
    let aggregator = Arc::new(HostnameAggregator::new(
        vec![source.clone() as Arc<dyn HostnameSource>],
        h.ctx.overrides.clone(),
        Some("p1".to_string()),
    ));
    let scheduler = Scheduler::new(h.ctx.clone(), h.reconciler.clone(), aggregator)
        .with_interval("p1", Duration::from_secs(3600));
    let handle = scheduler.handle();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(scheduler.run(shutdown_rx));

    // Initial tick converges the desired record.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(adapter.record_count().await, 1);
    let lists_after_start = adapter.calls_mentioning("list").await;

    // A burst of triggers coalesces into one cycle.
    source
        .set(vec![
            desired_a("app.example.com", "1.2.3.4", 300),
            desired_a("extra.example.com", "5.6.7.8", 300),
        ])
        .await;
    for _ in 0..5 {
        handle.trigger(Some("p1"), Trigger::DesiredChanged).await;
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(adapter.record_count().await, 2);
    let lists_after_trigger = adapter.calls_mentioning("list").await;
    assert_eq!(
        lists_after_trigger,
        lists_after_start + 1,
        "five triggers must coalesce into a single cycle"
    );

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), runner)
        .await
        .expect("scheduler must stop on shutdown")
        .unwrap();
}
