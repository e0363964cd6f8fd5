use async_trait::async_trait;

use crate::error::{AdapterError, Result};
use crate::record::{Record, OWNERSHIP_MARKER};
use crate::types::{
    AdapterKind, AdapterMetadata, AdapterSettings, Capabilities, ProviderRecord, RecordFilter,
};

/// Raw API error as received from a provider (internal use).
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// Provider-native error code, where one exists.
    pub code: Option<String>,
    /// Raw error message.
    pub message: String,
}

impl RawApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Extra context threaded into error mapping (internal use).
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// Record name (for `Conflict` and the like).
    pub record_name: Option<String>,
    /// Provider-native record id (for `RecordNotFound`).
    pub external_id: Option<String>,
    /// Zone name (for `ZoneNotFound`).
    pub zone: Option<String>,
}

/// Adapter error mapping trait (internal use).
///
/// Each adapter implements this to translate its provider's raw API
/// errors into the unified [`AdapterError`] type.
pub(crate) trait AdapterErrorMapper {
    /// Adapter identifier for error messages.
    fn adapter_name(&self) -> &'static str;

    /// Map a raw API error to the unified error type.
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> AdapterError;

    /// Shortcut: parse error.
    fn parse_error(&self, detail: impl ToString) -> AdapterError {
        AdapterError::ParseError {
            provider: self.adapter_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// Shortcut: unknown error (fallback).
    fn unknown_error(&self, raw: RawApiError) -> AdapterError {
        AdapterError::Unknown {
            provider: self.adapter_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// Uniform CRUD facade over one DNS provider instance.
///
/// An adapter is bound at construction to one provider account and one
/// zone; the engine addresses it by its `provider_id`. Implementations
/// must preserve unknown provider-side fields on round-trip: a
/// read-modify-write of a record the engine did not create must not drop
/// provider-specific attributes.
#[async_trait]
pub trait DnsAdapter: Send + Sync {
    /// Which provider implementation this is.
    fn kind(&self) -> AdapterKind;

    /// Engine-assigned identifier of this provider instance.
    fn provider_id(&self) -> &str;

    /// Static metadata for this adapter type (credential fields,
    /// capabilities). Does not require an instance.
    fn metadata() -> AdapterMetadata
    where
        Self: Sized;

    /// Capability flags for this provider.
    fn capabilities(&self) -> Capabilities;

    /// The per-instance settings this adapter was constructed with
    /// (zone, default TTL, default proxy flag).
    fn settings(&self) -> &AdapterSettings;

    /// The marker string to embed in record comments, when the provider
    /// supports comments. Records carrying this marker are re-imported
    /// as managed during discovery, so ownership survives database loss.
    fn ownership_marker(&self) -> Option<&'static str> {
        self.capabilities().comments.then_some(OWNERSHIP_MARKER)
    }

    /// Verify credentials and resolve the configured zone.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for rejected credentials, `ZoneNotFound` when the
    /// configured zone is absent from the account, `Unreachable` for
    /// network failures.
    async fn init(&self) -> Result<()>;

    /// List all records in the zone, paginating under the hood.
    ///
    /// Returned records are canonicalized and carry their provider-native
    /// `external_id`.
    async fn list_records(&self, filter: Option<&RecordFilter>) -> Result<Vec<ProviderRecord>>;

    /// Create a record.
    ///
    /// # Errors
    ///
    /// `Conflict` when a record with the same `(type, name, content)`
    /// already exists; `InvalidRecord`, `RateLimited`, `Unreachable`.
    async fn create_record(&self, record: &Record) -> Result<ProviderRecord>;

    /// Update the record with the given provider-native id.
    async fn update_record(&self, external_id: &str, record: &Record) -> Result<ProviderRecord>;

    /// Delete the record with the given provider-native id.
    ///
    /// Idempotent: deleting an unknown id succeeds.
    async fn delete_record(&self, external_id: &str) -> Result<()>;
}
