//! Cloudflare DNS adapter.

mod error;
mod http;
mod provider;
mod types;

use reqwest::Client;
use tokio::sync::OnceCell;

use crate::adapters::common::create_http_client;
use crate::types::AdapterSettings;

pub(crate) use types::{CloudflareDnsRecord, CloudflareResponse, CloudflareZone};

pub(crate) const CF_API_BASE: &str = "https://api.cloudflare.com/client/v4";
/// Cloudflare DNS Records API maximum page size.
pub(crate) const MAX_PAGE_SIZE_RECORDS: u32 = 100;

/// Cloudflare DNS adapter, bound to one zone.
pub struct CloudflareAdapter {
    pub(crate) client: Client,
    pub(crate) api_token: String,
    pub(crate) provider_id: String,
    pub(crate) settings: AdapterSettings,
    /// Zone id resolved lazily on first use and cached for the lifetime
    /// of the adapter.
    pub(crate) zone_id: OnceCell<String>,
}

impl CloudflareAdapter {
    pub fn new(provider_id: impl Into<String>, api_token: String, settings: AdapterSettings) -> Self {
        Self {
            client: create_http_client(),
            api_token,
            provider_id: provider_id.into(),
            settings,
            zone_id: OnceCell::new(),
        }
    }
}
