//! Unified engine error definitions.

use serde::Serialize;
use thiserror::Error;

use trafego_provider::RecordKey;

// Re-export the adapter error types.
pub use trafego_provider::{AdapterError, ErrorClass};

/// Error type for the engine layer.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum EngineError {
    /// No provider registered under this id.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// The provider could not be reached; the cycle was aborted without
    /// mutating any state.
    #[error("Provider '{provider_id}' unreachable: {detail}")]
    ProviderUnreachable {
        provider_id: String,
        detail: String,
    },

    /// The desired set handed to the reconciler is malformed (e.g.,
    /// duplicate keys).
    #[error("Invalid desired state: {0}")]
    InvalidDesiredState(String),

    /// Two sources produced different contents for the same key.
    #[error("Conflicting desired records for {key}: {values:?}")]
    DuplicateDesired {
        key: RecordKey,
        values: Vec<String>,
    },

    /// A reconciliation for this provider is already in flight; the
    /// request has been coalesced into it.
    #[error("Reconciliation already running for provider '{0}'")]
    ReconcileInProgress(String),

    /// A record lookup failed.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Storage layer error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Validation error (configuration, admin input).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The operation was cancelled by shutdown; no state was mutated.
    #[error("Operation cancelled")]
    Cancelled,

    /// Adapter-level error.
    #[error("{0}")]
    Adapter(#[from] AdapterError),
}

impl EngineError {
    /// Returns whether this error is expected (user input, missing
    /// resource, coalesced request).
    ///
    /// Use `warn` when this returns `true`, and `error` otherwise.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ProviderNotFound(_)
            | Self::RecordNotFound(_)
            | Self::InvalidDesiredState(_)
            | Self::DuplicateDesired { .. }
            | Self::ReconcileInProgress(_)
            | Self::ValidationError(_)
            | Self::Cancelled => true,
            Self::Adapter(e) => e.is_expected(),
            _ => false,
        }
    }
}

/// `Result` alias used by the engine layer.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use trafego_provider::RecordKind;

    #[test]
    fn display_provider_unreachable() {
        let e = EngineError::ProviderUnreachable {
            provider_id: "cf-prod".to_string(),
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Provider 'cf-prod' unreachable: connection refused"
        );
    }

    #[test]
    fn duplicate_desired_lists_values() {
        let e = EngineError::DuplicateDesired {
            key: RecordKey::new(RecordKind::A, "app.example.com"),
            values: vec!["1.2.3.4".to_string(), "5.6.7.8".to_string()],
        };
        let msg = e.to_string();
        assert!(msg.contains("A app.example.com"));
        assert!(msg.contains("1.2.3.4") && msg.contains("5.6.7.8"));
    }

    #[test]
    fn adapter_error_converts() {
        let e: EngineError = AdapterError::Unauthorized {
            provider: "cloudflare".to_string(),
            raw_message: None,
        }
        .into();
        assert!(matches!(e, EngineError::Adapter(_)));
    }

    #[test]
    fn expected_classification() {
        assert!(EngineError::Cancelled.is_expected());
        assert!(EngineError::ReconcileInProgress("p".into()).is_expected());
        assert!(!EngineError::StorageError("disk".into()).is_expected());
    }
}
