//! DigitalOcean API error mapping.

use crate::error::AdapterError;
use crate::traits::{AdapterErrorMapper, ErrorContext, RawApiError};

use super::DigitaloceanAdapter;

impl AdapterErrorMapper for DigitaloceanAdapter {
    fn adapter_name(&self) -> &'static str {
        "digitalocean"
    }

    /// DigitalOcean reports errors as `{ "id": "...", "message": "..." }`
    /// where `id` is a snake_case slug mirroring the HTTP status.
    fn map_error(&self, raw: RawApiError, ctx: ErrorContext) -> AdapterError {
        match raw.code.as_deref() {
            Some("not_found") => {
                if let Some(external_id) = ctx.external_id {
                    AdapterError::RecordNotFound {
                        provider: self.adapter_name().to_string(),
                        external_id,
                    }
                } else {
                    AdapterError::ZoneNotFound {
                        provider: self.adapter_name().to_string(),
                        zone: ctx.zone.unwrap_or_default(),
                    }
                }
            }
            Some("unauthorized" | "forbidden") => AdapterError::Unauthorized {
                provider: self.adapter_name().to_string(),
                raw_message: Some(raw.message),
            },
            Some("too_many_requests") => AdapterError::RateLimited {
                provider: self.adapter_name().to_string(),
                retry_after: None,
                raw_message: Some(raw.message),
            },
            Some("unprocessable_entity") => {
                // 422 covers both validation failures and duplicates; the
                // message is the only discriminator the API offers.
                if raw.message.to_lowercase().contains("already exists") {
                    AdapterError::Conflict {
                        provider: self.adapter_name().to_string(),
                        name: ctx.record_name.unwrap_or_default(),
                        raw_message: Some(raw.message),
                    }
                } else {
                    AdapterError::InvalidRecord {
                        field: "record".to_string(),
                        detail: raw.message,
                    }
                }
            }
            _ => self.unknown_error(raw),
        }
    }
}
