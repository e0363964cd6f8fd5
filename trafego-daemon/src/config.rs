//! Daemon configuration.
//!
//! Loaded from a JSON file (path from the first CLI argument or the
//! `TRAFEGO_CONFIG` environment variable). Credentials may reference
//! environment variables with an `env:NAME` value so tokens stay out of
//! the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use trafego_core::types::ProviderDescriptor;
use trafego_core::{EngineConfig, EngineError, EngineResult};
use trafego_provider::RecordKind;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonConfig {
    /// Path of the SQLite database file.
    pub database_path: PathBuf,

    /// Engine tunables.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Configured DNS provider instances.
    pub providers: Vec<ProviderDescriptor>,

    /// Configured hostname sources.
    pub sources: Vec<SourceConfig>,
}

impl DaemonConfig {
    /// Read and parse the configuration file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ValidationError(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|e| {
            EngineError::ValidationError(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.resolve_env_credentials()?;
        Ok(config)
    }

    /// Replace `env:NAME` credential values with the variable's content.
    fn resolve_env_credentials(&mut self) -> EngineResult<()> {
        for provider in &mut self.providers {
            for (key, value) in &mut provider.credentials {
                if let Some(var) = value.strip_prefix("env:") {
                    *value = std::env::var(var).map_err(|_| {
                        EngineError::ValidationError(format!(
                            "provider '{}': credential '{key}' references unset ${var}",
                            provider.id
                        ))
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        self.engine.validate()?;

        if self.providers.is_empty() {
            return Err(EngineError::ValidationError(
                "at least one provider must be configured".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(EngineError::ValidationError(
                    "provider id must not be empty".to_string(),
                ));
            }
            if !seen.insert(&provider.id) {
                return Err(EngineError::ValidationError(format!(
                    "duplicate provider id '{}'",
                    provider.id
                )));
            }
            if provider.settings.zone.trim().is_empty() {
                return Err(EngineError::ValidationError(format!(
                    "provider '{}': zone must not be empty",
                    provider.id
                )));
            }
        }

        if self
            .providers
            .iter()
            .filter(|p| p.is_default && p.enabled)
            .count()
            > 1
        {
            return Err(EngineError::ValidationError(
                "at most one provider may be the default".to_string(),
            ));
        }

        if self.sources.is_empty() {
            return Err(EngineError::ValidationError(
                "at least one hostname source must be configured".to_string(),
            ));
        }
        for source in &self.sources {
            source.validate()?;
        }

        Ok(())
    }

    /// The provider desired records route to when no hint is present.
    #[must_use]
    pub fn default_provider(&self) -> Option<String> {
        self.providers
            .iter()
            .find(|p| p.is_default && p.enabled)
            .or_else(|| self.providers.iter().find(|p| p.enabled))
            .map(|p| p.id.clone())
    }
}

/// Defaults for the records a source emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecordDefaults {
    /// Record type to emit (A or CNAME).
    pub kind: RecordKind,
    /// Record content: the target IP (A) or hostname (CNAME).
    pub content: String,
    /// TTL; `0` defers to the provider default.
    #[serde(default)]
    pub ttl: u32,
    /// Proxy flag, on providers that support it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    /// Route to a specific provider instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

/// Hostname source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SourceConfig {
    /// Read desired records from a JSON file on every snapshot.
    StaticFile {
        /// Path of the JSON file.
        path: PathBuf,
    },

    /// Poll a Traefik instance's router API and emit one record per
    /// `Host(...)` rule hostname.
    Traefik {
        /// Base URL of the Traefik API (e.g., `http://traefik:8080`).
        api_url: String,
        /// Shape of the records to emit.
        record: SourceRecordDefaults,
    },
}

impl SourceConfig {
    /// Validate the source configuration.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            Self::StaticFile { path } => {
                if path.as_os_str().is_empty() {
                    return Err(EngineError::ValidationError(
                        "static_file source: path must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Traefik { api_url, record } => {
                if api_url.is_empty() {
                    return Err(EngineError::ValidationError(
                        "traefik source: apiUrl must not be empty".to_string(),
                    ));
                }
                if record.content.trim().is_empty() {
                    return Err(EngineError::ValidationError(
                        "traefik source: record content must not be empty".to_string(),
                    ));
                }
                if !matches!(record.kind, RecordKind::A | RecordKind::Cname) {
                    return Err(EngineError::ValidationError(format!(
                        "traefik source: record kind must be A or CNAME, got {}",
                        record.kind
                    )));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "databasePath": "/var/lib/trafego/trafego.db",
            "providers": [{
                "id": "cf-prod",
                "name": "Cloudflare",
                "kind": "cloudflare",
                "credentials": {"apiToken": "tok"},
                "settings": {"zone": "example.com"},
                "isDefault": true
            }],
            "sources": [{
                "type": "traefik",
                "apiUrl": "http://traefik:8080",
                "record": {"kind": "CNAME", "content": "edge.example.com"}
            }]
        }"#
    }

    #[test]
    fn minimal_config_parses_and_validates() {
        let config: DaemonConfig = serde_json::from_str(minimal_json()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider().as_deref(), Some("cf-prod"));
        assert_eq!(config.engine.reconcile_interval_secs, 300);
    }

    #[test]
    fn empty_providers_rejected() {
        let mut config: DaemonConfig = serde_json::from_str(minimal_json()).unwrap();
        config.providers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_provider_ids_rejected() {
        let mut config: DaemonConfig = serde_json::from_str(minimal_json()).unwrap();
        let clone = config.providers[0].clone();
        config.providers.push(clone);
        assert!(config.validate().is_err());
    }

    #[test]
    fn traefik_source_requires_scalar_kind() {
        let json = r#"{
            "type": "traefik",
            "apiUrl": "http://traefik:8080",
            "record": {"kind": "MX", "content": "mail.example.com"}
        }"#;
        let source: SourceConfig = serde_json::from_str(json).unwrap();
        assert!(source.validate().is_err());
    }

    #[test]
    fn env_credentials_resolved() {
        std::env::set_var("TRAFEGO_TEST_TOKEN", "secret-token");
        let mut config: DaemonConfig = serde_json::from_str(minimal_json()).unwrap();
        config
            .providers[0]
            .credentials
            .insert("apiToken".to_string(), "env:TRAFEGO_TEST_TOKEN".to_string());
        config.resolve_env_credentials().unwrap();
        assert_eq!(
            config.providers[0].credentials.get("apiToken").unwrap(),
            "secret-token"
        );
    }

    #[test]
    fn missing_env_credential_fails() {
        let mut config: DaemonConfig = serde_json::from_str(minimal_json()).unwrap();
        config
            .providers[0]
            .credentials
            .insert("apiToken".to_string(), "env:TRAFEGO_UNSET_VAR".to_string());
        assert!(config.resolve_env_credentials().is_err());
    }
}
