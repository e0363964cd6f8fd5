//! Adapter registry trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use trafego_provider::DnsAdapter;

/// Registry of live adapter instances, indexed by provider id.
///
/// A default in-memory implementation is provided as
/// [`InMemoryAdapterRegistry`].
#[async_trait]
pub trait AdapterRegistry: Send + Sync {
    /// Register an adapter instance under a provider id.
    async fn register(&self, provider_id: String, adapter: Arc<dyn DnsAdapter>);

    /// Remove an adapter instance.
    async fn unregister(&self, provider_id: &str);

    /// Look up an adapter instance.
    async fn get(&self, provider_id: &str) -> Option<Arc<dyn DnsAdapter>>;

    /// List all registered provider ids.
    async fn list_provider_ids(&self) -> Vec<String>;
}

/// In-memory adapter registry; the default on all platforms.
#[derive(Clone, Default)]
pub struct InMemoryAdapterRegistry {
    adapters: Arc<RwLock<HashMap<String, Arc<dyn DnsAdapter>>>>,
}

impl InMemoryAdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdapterRegistry for InMemoryAdapterRegistry {
    async fn register(&self, provider_id: String, adapter: Arc<dyn DnsAdapter>) {
        self.adapters.write().await.insert(provider_id, adapter);
    }

    async fn unregister(&self, provider_id: &str) {
        self.adapters.write().await.remove(provider_id);
    }

    async fn get(&self, provider_id: &str) -> Option<Arc<dyn DnsAdapter>> {
        self.adapters.read().await.get(provider_id).cloned()
    }

    async fn list_provider_ids(&self) -> Vec<String> {
        self.adapters.read().await.keys().cloned().collect()
    }
}
