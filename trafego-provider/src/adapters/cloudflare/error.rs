//! Cloudflare API error code mapping.

use crate::error::AdapterError;
use crate::traits::{AdapterErrorMapper, ErrorContext, RawApiError};

use super::CloudflareAdapter;

impl AdapterErrorMapper for CloudflareAdapter {
    fn adapter_name(&self) -> &'static str {
        "cloudflare"
    }

    fn map_error(&self, raw: RawApiError, ctx: ErrorContext) -> AdapterError {
        let code: i64 = raw
            .code
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);

        match code {
            // Authentication / token problems.
            6003 | 9109 | 10000 => AdapterError::Unauthorized {
                provider: self.adapter_name().to_string(),
                raw_message: Some(raw.message),
            },
            // Record with identical type/name/content already exists.
            81053 | 81057 | 81058 => AdapterError::Conflict {
                provider: self.adapter_name().to_string(),
                name: ctx.record_name.unwrap_or_default(),
                raw_message: Some(raw.message),
            },
            // Record does not exist.
            81044 => AdapterError::RecordNotFound {
                provider: self.adapter_name().to_string(),
                external_id: ctx.external_id.unwrap_or_default(),
            },
            // Zone lookup failures.
            7003 | 1001 => AdapterError::ZoneNotFound {
                provider: self.adapter_name().to_string(),
                zone: ctx.zone.unwrap_or_default(),
            },
            // Validation errors on record payloads.
            9004 | 9005 | 9020 | 81099 => AdapterError::InvalidRecord {
                field: "record".to_string(),
                detail: raw.message,
            },
            _ => self.unknown_error(raw),
        }
    }
}
