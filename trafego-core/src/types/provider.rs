use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use trafego_provider::{AdapterKind, AdapterSettings};

/// A configured provider instance: identity, adapter type, opaque
/// credentials, and per-instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    /// Engine-assigned identifier, unique across the installation.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Which adapter implementation to use.
    pub kind: AdapterKind,
    /// Flat credential map, validated by the adapter factory.
    pub credentials: HashMap<String, String>,
    /// Per-instance settings (zone, default TTL, default proxy flag).
    pub settings: AdapterSettings,
    /// Disabled providers are skipped by the scheduler entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Desired records with no provider hint route here.
    #[serde(default)]
    pub is_default: bool,
}

fn default_true() -> bool {
    true
}

impl ProviderDescriptor {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: AdapterKind,
        settings: AdapterSettings,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            credentials: HashMap::new(),
            settings,
            enabled: true,
            is_default: false,
        }
    }
}
