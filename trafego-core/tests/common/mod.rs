//! Shared test fixtures: an in-process mock adapter with a scriptable
//! failure mode and an engine harness wired to the in-memory stores.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;

use trafego_core::memory::{MemoryManagedRecords, MemoryOverrides, MemoryProviderCache};
use trafego_core::services::{EngineContext, Reconciler};
use trafego_core::traits::{AdapterRegistry, InMemoryAdapterRegistry};
use trafego_core::types::DesiredRecord;
use trafego_core::EngineConfig;
use trafego_provider::{
    canonicalize, AdapterError, AdapterKind, AdapterMetadata, AdapterSettings, Capabilities,
    DnsAdapter, ProviderRecord, Record, RecordData, RecordFilter, Result as AdapterResult,
};

/// A DNS provider living entirely in memory, recording every call.
pub struct MockAdapter {
    provider_id: String,
    caps: Capabilities,
    settings: AdapterSettings,
    records: Mutex<HashMap<String, Record>>,
    next_id: AtomicU64,
    /// When set, every operation fails with a clone of this error.
    fail_with: Mutex<Option<AdapterError>>,
    /// When set, only operations whose journal entry contains the
    /// substring fail; everything else proceeds.
    fail_when: Mutex<Option<(String, AdapterError)>>,
    /// Simulate providers that assign a fresh id on every update.
    pub regenerate_ids_on_update: AtomicBool,
    /// Artificial per-operation latency.
    latency: Mutex<Duration>,
    /// Call journal: one entry per adapter operation, in order.
    pub calls: Mutex<Vec<String>>,
}

impl MockAdapter {
    pub fn new(provider_id: &str) -> Arc<Self> {
        Arc::new(Self {
            provider_id: provider_id.to_string(),
            caps: Capabilities {
                proxying: false,
                multi_value_a: true,
                caa: true,
                srv: true,
                comments: true,
            },
            settings: AdapterSettings::new("example.com"),
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_with: Mutex::new(None),
            fail_when: Mutex::new(None),
            regenerate_ids_on_update: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Seed a record directly into the fake provider, returning its id.
    pub async fn seed(&self, record: Record) -> String {
        let record = canonicalize(record).expect("seed record must be canonical");
        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().await.insert(id.clone(), record);
        id
    }

    pub async fn set_fail(&self, error: Option<AdapterError>) {
        *self.fail_with.lock().await = error;
    }

    /// Fail only operations whose journal entry contains `needle`.
    pub async fn set_fail_when(&self, needle: &str, error: AdapterError) {
        *self.fail_when.lock().await = Some((needle.to_string(), error));
    }

    /// Clear both failure modes.
    pub async fn clear_failures(&self) {
        *self.fail_with.lock().await = None;
        *self.fail_when.lock().await = None;
    }

    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = latency;
    }

    pub async fn record_by_id(&self, external_id: &str) -> Option<Record> {
        self.records.lock().await.get(external_id).cloned()
    }

    pub async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn call_log(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_mentioning(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    async fn observe(&self, call: String) -> AdapterResult<()> {
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.calls.lock().await.push(call.clone());
        if let Some(error) = self.fail_with.lock().await.clone() {
            return Err(error);
        }
        if let Some((needle, error)) = self.fail_when.lock().await.clone() {
            if call.contains(&needle) {
                return Err(error);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DnsAdapter for MockAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Cloudflare
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn metadata() -> AdapterMetadata {
        AdapterMetadata {
            kind: AdapterKind::Cloudflare,
            name: "Mock".to_string(),
            description: "in-memory test adapter".to_string(),
            required_fields: vec![],
            capabilities: Capabilities::default(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    async fn init(&self) -> AdapterResult<()> {
        self.observe("init".to_string()).await
    }

    async fn list_records(&self, _filter: Option<&RecordFilter>) -> AdapterResult<Vec<ProviderRecord>> {
        self.observe("list".to_string()).await?;
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .map(|(id, record)| ProviderRecord::new(id.clone(), record.clone()))
            .collect())
    }

    async fn create_record(&self, record: &Record) -> AdapterResult<ProviderRecord> {
        self.observe(format!(
            "create {} {} {}",
            record.kind(),
            record.name,
            record.content()
        ))
        .await?;

        let mut records = self.records.lock().await;
        let duplicate = records.values().any(|existing| {
            existing.key() == record.key() && existing.content() == record.content()
        });
        if duplicate {
            return Err(AdapterError::Conflict {
                provider: "mock".to_string(),
                name: record.name.clone(),
                raw_message: None,
            });
        }

        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        records.insert(id.clone(), record.clone());
        Ok(ProviderRecord::new(id, record.clone()))
    }

    async fn update_record(&self, external_id: &str, record: &Record) -> AdapterResult<ProviderRecord> {
        self.observe(format!(
            "update {external_id} {} {}",
            record.name,
            record.content()
        ))
        .await?;

        let mut records = self.records.lock().await;
        if !records.contains_key(external_id) {
            return Err(AdapterError::RecordNotFound {
                provider: "mock".to_string(),
                external_id: external_id.to_string(),
            });
        }

        if self.regenerate_ids_on_update.load(Ordering::SeqCst) {
            records.remove(external_id);
            let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            records.insert(id.clone(), record.clone());
            Ok(ProviderRecord::new(id, record.clone()))
        } else {
            records.insert(external_id.to_string(), record.clone());
            Ok(ProviderRecord::new(external_id.to_string(), record.clone()))
        }
    }

    async fn delete_record(&self, external_id: &str) -> AdapterResult<()> {
        self.observe(format!("delete {external_id}")).await?;
        self.records.lock().await.remove(external_id);
        Ok(())
    }
}

/// Everything a reconciler test needs, wired to in-memory stores.
pub struct Harness {
    pub ctx: Arc<EngineContext>,
    pub reconciler: Arc<Reconciler>,
    pub registry: Arc<InMemoryAdapterRegistry>,
}

impl Harness {
    pub async fn with_config(config: EngineConfig) -> Self {
        let registry = Arc::new(InMemoryAdapterRegistry::new());
        let ctx = Arc::new(EngineContext::new(
            registry.clone(),
            Arc::new(MemoryProviderCache::new()),
            Arc::new(MemoryManagedRecords::new()),
            Arc::new(MemoryOverrides::new()),
            config,
        ));
        let reconciler = Arc::new(Reconciler::new(ctx.clone()));
        Self {
            ctx,
            reconciler,
            registry,
        }
    }

    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    /// Register a fresh mock adapter under `provider_id`.
    pub async fn add_provider(&self, provider_id: &str) -> Arc<MockAdapter> {
        let adapter = MockAdapter::new(provider_id);
        self.registry
            .register(provider_id.to_string(), adapter.clone())
            .await;
        adapter
    }
}

/// A fixed, deterministic "now" for orphan-timing assertions.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn desired_a(name: &str, address: &str, ttl: u32) -> DesiredRecord {
    DesiredRecord::new(Record::new(
        name,
        ttl,
        RecordData::A {
            address: address.to_string(),
        },
    ))
}

pub fn desired_cname(name: &str, target: &str, ttl: u32) -> DesiredRecord {
    DesiredRecord::new(Record::new(
        name,
        ttl,
        RecordData::CNAME {
            target: target.to_string(),
        },
    ))
}

pub fn a_record(name: &str, address: &str, ttl: u32) -> Record {
    Record::new(
        name,
        ttl,
        RecordData::A {
            address: address.to_string(),
        },
    )
}
