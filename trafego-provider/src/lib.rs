//! # trafego-provider
//!
//! Provider adapter abstraction for the Trafego DNS reconciliation
//! engine: a canonical record model with a stable content fingerprint,
//! a uniform CRUD trait over heterogeneous DNS provider APIs, and
//! concrete adapters for the supported providers.
//!
//! ## Supported Providers
//!
//! | Provider | Feature Flag | Auth Method | Comments/Marker |
//! |----------|-------------|-------------|-----------------|
//! | [Cloudflare](https://www.cloudflare.com/) | `cloudflare` | Bearer Token | yes |
//! | [DigitalOcean](https://www.digitalocean.com/) | `digitalocean` | Bearer Token | no |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trafego_provider::{
//!     create_adapter, AdapterCredentials, AdapterSettings, DnsAdapter, Record, RecordData,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = create_adapter(
//!         "prod-cf",
//!         AdapterCredentials::Cloudflare { api_token: "token".into() },
//!         AdapterSettings::new("example.com"),
//!     )?;
//!
//!     adapter.init().await?;
//!
//!     let record = Record::new(
//!         "app.example.com",
//!         300,
//!         RecordData::A { address: "1.2.3.4".into() },
//!     );
//!     let created = adapter.create_record(&record).await?;
//!     println!("created as {}", created.external_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, AdapterError>`](AdapterError).
//! Errors classify into transient / permanent / conflict via
//! [`AdapterError::class`]; transient errors are retried internally with
//! exponential backoff and jitter before surfacing.

mod adapters;
mod error;
mod factory;
mod http_client;
mod record;
mod traits;
mod types;

// Re-export error types
pub use error::{AdapterError, ErrorClass, Result};

// Re-export the record model
pub use record::{
    canonical_name, canonicalize, clamp_ttl, fingerprint, records_equal, Record, RecordData,
    RecordKey, RecordKind, OWNERSHIP_MARKER,
};

// Re-export factory functions
pub use factory::{all_adapter_metadata, create_adapter};

// Re-export the core trait only (mapper traits stay internal)
pub use traits::DnsAdapter;

// Re-export types
pub use types::{
    AdapterCredentials, AdapterKind, AdapterMetadata, AdapterSettings, Capabilities,
    CredentialError, CredentialField, FieldType, ProviderRecord, RecordFilter,
};

// Re-export concrete adapters (behind feature flags)
#[cfg(feature = "cloudflare")]
pub use adapters::CloudflareAdapter;

#[cfg(feature = "digitalocean")]
pub use adapters::DigitaloceanAdapter;
