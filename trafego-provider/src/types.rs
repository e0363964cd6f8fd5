use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::Record;

// ============ Adapter Types ============

/// Identifies which DNS provider adapter implementation to use.
///
/// Each variant is gated behind its corresponding feature flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Cloudflare DNS. Requires feature `cloudflare`.
    #[cfg(feature = "cloudflare")]
    Cloudflare,
    /// DigitalOcean DNS. Requires feature `digitalocean`.
    #[cfg(feature = "digitalocean")]
    Digitalocean,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare => write!(f, "cloudflare"),
            #[cfg(feature = "digitalocean")]
            Self::Digitalocean => write!(f, "digitalocean"),
        }
    }
}

/// Feature support flags for a provider adapter.
///
/// The reconciler consults these before deciding how to resolve
/// conflicts (multi-value records), whether to propagate the proxy flag,
/// and whether ownership markers can be embedded in comments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// CDN proxying (orange-cloud style).
    pub proxying: bool,
    /// Multiple A records with different contents under one name.
    pub multi_value_a: bool,
    /// CAA record support.
    pub caa: bool,
    /// SRV record support.
    pub srv: bool,
    /// Free-form comments on records (carrier for the ownership marker).
    pub comments: bool,
}

// ============ Adapter Metadata ============

/// The input type of a credential field (affects UI rendering).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Plain text input.
    Text,
    /// Masked/password input.
    Password,
}

/// Definition of a single credential field required by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialField {
    /// Machine-readable field key (e.g., `"apiToken"`).
    pub key: String,
    /// Human-readable label (e.g., `"API Token"`).
    pub label: String,
    /// Input type for UI rendering.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Optional help/description text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

/// Static metadata describing a provider adapter: identity, required
/// credential fields, and capability flags.
///
/// Obtain via [`DnsAdapter::metadata()`](crate::DnsAdapter::metadata) or
/// [`all_adapter_metadata()`](crate::all_adapter_metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterMetadata {
    /// Adapter type identifier.
    pub kind: AdapterKind,
    /// Human-readable adapter name.
    pub name: String,
    /// Short description of the provider.
    pub description: String,
    /// Credential fields required to authenticate.
    pub required_fields: Vec<CredentialField>,
    /// Capability flags for this provider.
    pub capabilities: Capabilities,
}

// ============ Credentials ============

/// Validation error for adapter credentials.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CredentialError {
    /// A required credential field is missing entirely.
    #[error("Missing required field: {label}")]
    MissingField {
        kind: AdapterKind,
        field: String,
        label: String,
    },
    /// A credential field is present but empty/whitespace-only.
    #[error("Field must not be empty: {label}")]
    EmptyField {
        kind: AdapterKind,
        field: String,
        label: String,
    },
    /// The adapter kind is unknown or its feature is disabled.
    #[error("Unsupported adapter: {detail}")]
    UnsupportedAdapter { detail: String },
}

/// Type-safe credential container for all supported adapters.
///
/// Serialized as a tagged enum:
///
/// ```json
/// { "provider": "cloudflare", "credentials": { "api_token": "..." } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", content = "credentials")]
pub enum AdapterCredentials {
    /// Cloudflare API token. Requires feature `cloudflare`.
    #[cfg(feature = "cloudflare")]
    #[serde(rename = "cloudflare")]
    Cloudflare { api_token: String },

    /// DigitalOcean personal access token. Requires feature `digitalocean`.
    #[cfg(feature = "digitalocean")]
    #[serde(rename = "digitalocean")]
    Digitalocean { api_token: String },
}

impl AdapterCredentials {
    /// Construct credentials from a flat key/value map, validating
    /// required fields.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if a required field is missing or empty.
    pub fn from_map(
        kind: AdapterKind,
        map: &HashMap<String, String>,
    ) -> Result<Self, CredentialError> {
        match kind {
            #[cfg(feature = "cloudflare")]
            AdapterKind::Cloudflare => Ok(Self::Cloudflare {
                api_token: Self::required_field(kind, map, "apiToken", "API Token")?,
            }),
            #[cfg(feature = "digitalocean")]
            AdapterKind::Digitalocean => Ok(Self::Digitalocean {
                api_token: Self::required_field(kind, map, "apiToken", "API Token")?,
            }),
        }
    }

    fn required_field(
        kind: AdapterKind,
        map: &HashMap<String, String>,
        key: &str,
        label: &str,
    ) -> Result<String, CredentialError> {
        match map.get(key) {
            None => Err(CredentialError::MissingField {
                kind,
                field: key.to_string(),
                label: label.to_string(),
            }),
            Some(v) if v.trim().is_empty() => Err(CredentialError::EmptyField {
                kind,
                field: key.to_string(),
                label: label.to_string(),
            }),
            Some(v) => Ok(v.clone()),
        }
    }

    /// Convert credentials back to a flat key/value map.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        match self {
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare { api_token } => [("apiToken".to_string(), api_token.clone())].into(),
            #[cfg(feature = "digitalocean")]
            Self::Digitalocean { api_token } => {
                [("apiToken".to_string(), api_token.clone())].into()
            }
        }
    }

    /// Returns the [`AdapterKind`] corresponding to this credential variant.
    #[must_use]
    pub fn kind(&self) -> AdapterKind {
        match self {
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare { .. } => AdapterKind::Cloudflare,
            #[cfg(feature = "digitalocean")]
            Self::Digitalocean { .. } => AdapterKind::Digitalocean,
        }
    }
}

// ============ Adapter Settings ============

/// Per-instance adapter settings, supplied alongside credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterSettings {
    /// The DNS zone (apex domain) this adapter instance manages.
    pub zone: String,
    /// Default TTL applied to records with no explicit TTL.
    #[serde(default)]
    pub default_ttl: u32,
    /// Default proxy flag, on providers that support proxying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_proxied: Option<bool>,
}

impl AdapterSettings {
    #[must_use]
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            default_ttl: 0,
            default_proxied: None,
        }
    }
}

// ============ Provider Records ============

/// A record as it exists at the provider: the canonical record plus the
/// provider-native identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    /// Provider-native record identifier.
    pub external_id: String,
    /// Canonical record content.
    #[serde(flatten)]
    pub record: Record,
}

impl ProviderRecord {
    #[must_use]
    pub fn new(external_id: impl Into<String>, record: Record) -> Self {
        Self {
            external_id: external_id.into(),
            record,
        }
    }
}

/// Optional server- or client-side filter for record listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    /// Restrict to one record type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<crate::record::RecordKind>,
    /// Restrict to an exact (canonical) name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_cloudflare_roundtrip() {
        let map: HashMap<String, String> =
            [("apiToken".to_string(), "my-token".to_string())].into();
        let cred = AdapterCredentials::from_map(AdapterKind::Cloudflare, &map).unwrap();
        let back = cred.to_map();
        assert_eq!(back.get("apiToken").map(String::as_str), Some("my-token"));
        assert_eq!(cred.kind(), AdapterKind::Cloudflare);
    }

    #[test]
    fn credentials_digitalocean_roundtrip() {
        let map: HashMap<String, String> = [("apiToken".to_string(), "do-token".to_string())].into();
        let cred = AdapterCredentials::from_map(AdapterKind::Digitalocean, &map).unwrap();
        assert_eq!(cred.kind(), AdapterKind::Digitalocean);
        assert_eq!(
            cred.to_map().get("apiToken").map(String::as_str),
            Some("do-token")
        );
    }

    #[test]
    fn credentials_missing_field() {
        let map: HashMap<String, String> = HashMap::new();
        let res = AdapterCredentials::from_map(AdapterKind::Cloudflare, &map);
        assert!(
            matches!(&res, Err(CredentialError::MissingField { .. })),
            "unexpected result: {res:?}"
        );
    }

    #[test]
    fn credentials_empty_field() {
        let map: HashMap<String, String> = [("apiToken".to_string(), "  ".to_string())].into();
        let res = AdapterCredentials::from_map(AdapterKind::Cloudflare, &map);
        assert!(
            matches!(&res, Err(CredentialError::EmptyField { .. })),
            "unexpected result: {res:?}"
        );
    }

    #[test]
    fn adapter_kind_serde() {
        let json = serde_json::to_string(&AdapterKind::Cloudflare).unwrap();
        assert_eq!(json, "\"cloudflare\"");
        let back: AdapterKind = serde_json::from_str("\"digitalocean\"").unwrap();
        assert_eq!(back, AdapterKind::Digitalocean);
    }

    #[test]
    fn capabilities_default_all_off() {
        let caps = Capabilities::default();
        assert!(!caps.proxying && !caps.multi_value_a && !caps.comments);
    }
}
