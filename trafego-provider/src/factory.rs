//! Adapter factory functions and metadata.

use std::sync::Arc;

use crate::error::Result;
use crate::traits::DnsAdapter;
use crate::types::{AdapterCredentials, AdapterMetadata, AdapterSettings};

#[cfg(feature = "cloudflare")]
use crate::adapters::CloudflareAdapter;
#[cfg(feature = "digitalocean")]
use crate::adapters::DigitaloceanAdapter;

/// Create an adapter instance from credentials and per-instance settings.
///
/// `provider_id` is the engine-assigned identifier the instance will
/// report from [`DnsAdapter::provider_id`].
pub fn create_adapter(
    provider_id: impl Into<String>,
    credentials: AdapterCredentials,
    settings: AdapterSettings,
) -> Result<Arc<dyn DnsAdapter>> {
    match credentials {
        #[cfg(feature = "cloudflare")]
        AdapterCredentials::Cloudflare { api_token } => Ok(Arc::new(CloudflareAdapter::new(
            provider_id,
            api_token,
            settings,
        ))),
        #[cfg(feature = "digitalocean")]
        AdapterCredentials::Digitalocean { api_token } => Ok(Arc::new(DigitaloceanAdapter::new(
            provider_id,
            api_token,
            settings,
        ))),
    }
}

/// Metadata for every adapter compiled into this build.
pub fn all_adapter_metadata() -> Vec<AdapterMetadata> {
    vec![
        #[cfg(feature = "cloudflare")]
        CloudflareAdapter::metadata(),
        #[cfg(feature = "digitalocean")]
        DigitaloceanAdapter::metadata(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdapterKind;

    #[test]
    fn factory_builds_cloudflare() {
        let adapter = create_adapter(
            "prov-1",
            AdapterCredentials::Cloudflare {
                api_token: "tok".to_string(),
            },
            AdapterSettings::new("example.com"),
        )
        .unwrap();
        assert_eq!(adapter.kind(), AdapterKind::Cloudflare);
        assert_eq!(adapter.provider_id(), "prov-1");
        assert!(adapter.capabilities().comments);
        assert_eq!(adapter.ownership_marker(), Some("trafego:owned"));
    }

    #[test]
    fn factory_builds_digitalocean() {
        let adapter = create_adapter(
            "prov-2",
            AdapterCredentials::Digitalocean {
                api_token: "tok".to_string(),
            },
            AdapterSettings::new("example.com"),
        )
        .unwrap();
        assert_eq!(adapter.kind(), AdapterKind::Digitalocean);
        assert!(!adapter.capabilities().comments);
        assert_eq!(adapter.ownership_marker(), None);
    }

    #[test]
    fn metadata_lists_all_adapters() {
        let all = all_adapter_metadata();
        assert_eq!(all.len(), 2);
    }
}
