//! Hostname source implementations.

mod static_file;
mod traefik;

pub use static_file::StaticFileSource;
pub use traefik::TraefikSource;

use std::sync::Arc;

use trafego_core::traits::HostnameSource;

use crate::config::SourceConfig;

/// Build a source instance from its configuration.
pub fn build_source(config: &SourceConfig) -> Arc<dyn HostnameSource> {
    match config {
        SourceConfig::StaticFile { path } => Arc::new(StaticFileSource::new(path.clone())),
        SourceConfig::Traefik { api_url, record } => {
            Arc::new(TraefikSource::new(api_url.clone(), record.clone()))
        }
    }
}
