use serde::{Deserialize, Serialize};

/// Broad classification of adapter failures, used by the reconciler to
/// decide between retrying, surfacing, and conflict resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying with backoff (network, timeout, rate limit, 5xx).
    Transient,
    /// Retrying will not help (validation, auth, missing zone).
    Permanent,
    /// A record with the same target already exists at the provider.
    Conflict,
    /// Unmapped provider error.
    Unknown,
}

/// Unified adapter error type.
///
/// Each concrete adapter maps its provider's raw API errors onto these
/// variants; callers never see provider-native error codes.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "code")]
pub enum AdapterError {
    /// Network-level failure reaching the provider API.
    #[error("[{provider}] Unreachable: {detail}")]
    Unreachable { provider: String, detail: String },

    /// Request timed out.
    #[error("[{provider}] Request timeout: {detail}")]
    Timeout { provider: String, detail: String },

    /// API rate limit hit (HTTP 429 or equivalent).
    ///
    /// Unlike a hard quota, this is temporary: back off and retry,
    /// honoring `retry_after` when the provider sent one.
    #[error("[{provider}] Rate limited")]
    RateLimited {
        provider: String,
        retry_after: Option<u64>,
        raw_message: Option<String>,
    },

    /// Credentials rejected or insufficient permissions.
    #[error("[{provider}] Unauthorized")]
    Unauthorized {
        provider: String,
        raw_message: Option<String>,
    },

    /// The configured zone does not exist on this account.
    #[error("[{provider}] Zone '{zone}' not found")]
    ZoneNotFound { provider: String, zone: String },

    /// No record with the given provider-native id.
    #[error("[{provider}] Record '{external_id}' not found")]
    RecordNotFound {
        provider: String,
        external_id: String,
    },

    /// A record with the same `(type, name, content)` already exists.
    #[error("[{provider}] Record '{name}' already exists")]
    Conflict {
        provider: String,
        name: String,
        raw_message: Option<String>,
    },

    /// The record failed canonical validation; `field` names the culprit.
    #[error("Invalid record: {field}: {detail}")]
    InvalidRecord { field: String, detail: String },

    /// The provider cannot store this record type.
    #[error("[{provider}] Unsupported record type: {record_type}")]
    UnsupportedRecordType {
        provider: String,
        record_type: String,
    },

    /// Provider response could not be decoded.
    #[error("[{provider}] Parse error: {detail}")]
    ParseError { provider: String, detail: String },

    /// Fallback for errors the adapter could not map.
    #[error("[{provider}] {raw_message}")]
    Unknown {
        provider: String,
        raw_code: Option<String>,
        raw_message: String,
    },
}

impl AdapterError {
    /// Shorthand for a validation failure on a named field.
    pub fn invalid(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidRecord {
            field: field.into(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => {
                ErrorClass::Transient
            }
            Self::Unauthorized { .. }
            | Self::ZoneNotFound { .. }
            | Self::RecordNotFound { .. }
            | Self::InvalidRecord { .. }
            | Self::UnsupportedRecordType { .. }
            | Self::ParseError { .. } => ErrorClass::Permanent,
            Self::Conflict { .. } => ErrorClass::Conflict,
            Self::Unknown { .. } => ErrorClass::Unknown,
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// True for errors caused by the request rather than the system
    /// (missing record, bad input). Log these at `warn`, not `error`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::RecordNotFound { .. }
                | Self::Conflict { .. }
                | Self::InvalidRecord { .. }
                | Self::UnsupportedRecordType { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unreachable() {
        let e = AdapterError::Unreachable {
            provider: "cloudflare".to_string(),
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "[cloudflare] Unreachable: connection refused"
        );
    }

    #[test]
    fn display_invalid_record() {
        let e = AdapterError::invalid("ttl", "must be positive");
        assert_eq!(e.to_string(), "Invalid record: ttl: must be positive");
    }

    #[test]
    fn class_transient_variants() {
        for e in [
            AdapterError::Unreachable {
                provider: "t".into(),
                detail: "d".into(),
            },
            AdapterError::Timeout {
                provider: "t".into(),
                detail: "d".into(),
            },
            AdapterError::RateLimited {
                provider: "t".into(),
                retry_after: Some(5),
                raw_message: None,
            },
        ] {
            assert_eq!(e.class(), ErrorClass::Transient, "{e}");
            assert!(e.is_transient());
        }
    }

    #[test]
    fn class_permanent_variants() {
        for e in [
            AdapterError::Unauthorized {
                provider: "t".into(),
                raw_message: None,
            },
            AdapterError::ZoneNotFound {
                provider: "t".into(),
                zone: "example.com".into(),
            },
            AdapterError::invalid("name", "empty"),
            AdapterError::ParseError {
                provider: "t".into(),
                detail: "bad json".into(),
            },
        ] {
            assert_eq!(e.class(), ErrorClass::Permanent, "{e}");
            assert!(!e.is_transient());
        }
    }

    #[test]
    fn class_conflict() {
        let e = AdapterError::Conflict {
            provider: "t".into(),
            name: "www.example.com".into(),
            raw_message: None,
        };
        assert_eq!(e.class(), ErrorClass::Conflict);
    }

    #[test]
    fn class_unknown() {
        let e = AdapterError::Unknown {
            provider: "t".into(),
            raw_code: Some("E42".into()),
            raw_message: "boom".into(),
        };
        assert_eq!(e.class(), ErrorClass::Unknown);
    }

    #[test]
    fn serialize_json_tagged() {
        let e = AdapterError::RateLimited {
            provider: "cloudflare".to_string(),
            retry_after: Some(60),
            raw_message: None,
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"code\":\"RateLimited\""));
        assert!(json.contains("\"retry_after\":60"));
    }

    #[test]
    fn deserialize_round_trip() {
        let original = AdapterError::ZoneNotFound {
            provider: "digitalocean".to_string(),
            zone: "example.com".to_string(),
        };
        let json = serde_json::to_string(&original).unwrap();
        let back: AdapterError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), original.to_string());
    }
}
