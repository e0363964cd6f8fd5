//! Abstract traits the engine is built against: the adapter registry,
//! hostname sources, and the storage repositories.

mod adapter_registry;
mod cache_repository;
mod hostname_source;
mod managed_repository;
mod override_repository;

pub use adapter_registry::{AdapterRegistry, InMemoryAdapterRegistry};
pub use cache_repository::ProviderCacheRepository;
pub use hostname_source::HostnameSource;
pub use managed_repository::ManagedRecordRepository;
pub use override_repository::OverrideRepository;
