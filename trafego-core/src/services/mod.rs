//! Engine services.

mod aggregator;
mod orphan;
mod reconciler;
mod scheduler;

pub use aggregator::{DesiredSet, HostnameAggregator, RejectedDesired};
pub use orphan::{OrphanDetector, OrphanSummary};
pub use reconciler::Reconciler;
pub use scheduler::{EngineHandle, Scheduler, Trigger};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use trafego_provider::DnsAdapter;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::traits::{
    AdapterRegistry, ManagedRecordRepository, OverrideRepository, ProviderCacheRepository,
};
use crate::types::Plan;

/// Shared state every service hangs off: the adapter registry, the three
/// repositories, configuration, and the per-provider runtime state
/// (single-writer locks, pause flags, last computed plans).
pub struct EngineContext {
    pub registry: Arc<dyn AdapterRegistry>,
    pub cache: Arc<dyn ProviderCacheRepository>,
    pub managed: Arc<dyn ManagedRecordRepository>,
    pub overrides: Arc<dyn OverrideRepository>,
    pub config: EngineConfig,

    /// One mutex per provider enforcing the single-writer guarantee.
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    /// Providers currently paused: plans are computed, nothing applied.
    paused: RwLock<HashSet<String>>,
    /// Most recent plan per provider (dry-run output for the admin API).
    last_plans: RwLock<HashMap<String, Plan>>,
}

impl EngineContext {
    #[must_use]
    pub fn new(
        registry: Arc<dyn AdapterRegistry>,
        cache: Arc<dyn ProviderCacheRepository>,
        managed: Arc<dyn ManagedRecordRepository>,
        overrides: Arc<dyn OverrideRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            managed,
            overrides,
            config,
            locks: RwLock::new(HashMap::new()),
            paused: RwLock::new(HashSet::new()),
            last_plans: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the adapter for a provider id.
    pub async fn adapter(&self, provider_id: &str) -> EngineResult<Arc<dyn DnsAdapter>> {
        self.registry
            .get(provider_id)
            .await
            .ok_or_else(|| EngineError::ProviderNotFound(provider_id.to_string()))
    }

    /// The single-writer mutex for a provider, created on first use.
    pub async fn provider_lock(&self, provider_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(provider_id) {
            return lock.clone();
        }
        self.locks
            .write()
            .await
            .entry(provider_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn pause(&self, provider_id: &str) {
        self.paused.write().await.insert(provider_id.to_string());
        log::info!("provider '{provider_id}' paused");
    }

    pub async fn resume(&self, provider_id: &str) {
        self.paused.write().await.remove(provider_id);
        log::info!("provider '{provider_id}' resumed");
    }

    pub async fn is_paused(&self, provider_id: &str) -> bool {
        self.paused.read().await.contains(provider_id)
    }

    pub(crate) async fn store_last_plan(&self, plan: Plan) {
        self.last_plans
            .write()
            .await
            .insert(plan.provider_id.clone(), plan);
    }

    /// The most recent plan computed for a provider, if any.
    pub async fn last_plan(&self, provider_id: &str) -> Option<Plan> {
        self.last_plans.read().await.get(provider_id).cloned()
    }
}
