//! DigitalOcean HTTP request methods.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http_client::{truncate_for_log, HttpUtils};
use crate::traits::{AdapterErrorMapper, ErrorContext, RawApiError};

use super::types::DoErrorBody;
use super::{DigitaloceanAdapter, DO_API_BASE};

impl DigitaloceanAdapter {
    /// Interpret a DigitalOcean response: 2xx parses the payload, 404 and
    /// 422 map through the error envelope, everything else falls back to
    /// the raw body.
    fn handle_do_response<T: for<'de> Deserialize<'de>>(
        &self,
        status: u16,
        response_text: &str,
        ctx: ErrorContext,
    ) -> Result<T> {
        if (200..300).contains(&status) {
            return HttpUtils::parse_json(response_text, self.adapter_name());
        }

        Err(self.map_status_error(status, response_text, ctx))
    }

    /// Map a non-2xx response through the error envelope.
    pub(crate) fn map_status_error(
        &self,
        status: u16,
        response_text: &str,
        ctx: ErrorContext,
    ) -> crate::error::AdapterError {
        let body: DoErrorBody = serde_json::from_str(response_text).unwrap_or(DoErrorBody {
            id: None,
            message: None,
        });

        let raw = match (body.id, body.message) {
            (Some(id), Some(message)) => RawApiError::with_code(id, message),
            (Some(id), None) => RawApiError::with_code(id, format!("HTTP {status}")),
            (None, Some(message)) => RawApiError::new(message),
            (None, None) => RawApiError::new(format!("HTTP {status}")),
        };

        log::error!("[digitalocean] API error (HTTP {status}): {}", raw.message);
        self.map_error(raw, ctx)
    }

    /// Perform a GET request and decode the payload.
    pub(crate) async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        ctx: ErrorContext,
    ) -> Result<T> {
        let url = format!("{DO_API_BASE}{path}");

        let request = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token));

        let (status, response_text) =
            HttpUtils::execute_request_with_retry(request, self.adapter_name(), "GET", &url).await?;

        self.handle_do_response(status, &response_text, ctx)
    }

    /// Perform a POST request with a JSON body.
    pub(crate) async fn post_json<T, B>(&self, path: &str, body: &B, ctx: ErrorContext) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        self.request_with_body(reqwest::Method::POST, path, body, ctx)
            .await
    }

    /// Perform a PUT request with a JSON body.
    pub(crate) async fn put_json<T, B>(&self, path: &str, body: &B, ctx: ErrorContext) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        self.request_with_body(reqwest::Method::PUT, path, body, ctx)
            .await
    }

    async fn request_with_body<T, B>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
        ctx: ErrorContext,
    ) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        let url = format!("{DO_API_BASE}{path}");

        if log::log_enabled!(log::Level::Debug) {
            let body_json = serde_json::to_string(body)
                .unwrap_or_else(|_| "Failed to serialize request body".to_string());
            log::debug!(
                "[digitalocean] Request body: {}",
                truncate_for_log(&body_json)
            );
        }

        let request = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(body);

        let (status, response_text) =
            HttpUtils::execute_request_with_retry(request, self.adapter_name(), method.as_str(), &url)
                .await?;

        self.handle_do_response(status, &response_text, ctx)
    }

    /// Perform a DELETE request. Returns the HTTP status on success so
    /// the caller can treat 404 as an idempotent no-op.
    pub(crate) async fn delete(&self, path: &str) -> Result<u16> {
        let url = format!("{DO_API_BASE}{path}");

        let request = self
            .client
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.api_token));

        let (status, _response_text) =
            HttpUtils::execute_request_with_retry(request, self.adapter_name(), "DELETE", &url)
                .await?;

        Ok(status)
    }
}
