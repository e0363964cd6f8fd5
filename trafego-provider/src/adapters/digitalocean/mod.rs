//! DigitalOcean DNS adapter.

mod error;
mod http;
mod provider;
mod types;

use reqwest::Client;

use crate::adapters::common::create_http_client;
use crate::types::AdapterSettings;

pub(crate) use types::{DoDomainRecord, DoRecordList, DoSingleRecord};

pub(crate) const DO_API_BASE: &str = "https://api.digitalocean.com/v2";
/// DigitalOcean records API maximum page size.
pub(crate) const MAX_PAGE_SIZE_RECORDS: u32 = 200;

/// DigitalOcean DNS adapter, bound to one domain.
pub struct DigitaloceanAdapter {
    pub(crate) client: Client,
    pub(crate) api_token: String,
    pub(crate) provider_id: String,
    pub(crate) settings: AdapterSettings,
}

impl DigitaloceanAdapter {
    pub fn new(provider_id: impl Into<String>, api_token: String, settings: AdapterSettings) -> Self {
        Self {
            client: create_http_client(),
            api_token,
            provider_id: provider_id.into(),
            settings,
        }
    }
}
