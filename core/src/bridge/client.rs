//! Authenticated request executor.
//!
//! # Design
//! `BridgeHttpClient` is the single place that turns a logical call into an
//! `HttpRequest`: header defaults and negotiation, bearer auth, body
//! encoding and timeouts. It decodes every response into a [`Payload`] and
//! maps status >= 400 to [`ApiError`] after decoding, so the error carries
//! structured detail when the server sent JSON and `{"raw": ...}` otherwise.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::bridge::options::BridgeOptions;
use crate::error::{ApiError, Result};
use crate::http::{has_header, merge_headers, set_header, HttpMethod, HttpRequest, HttpTransport};
use crate::payload::{decode_json, raw_wrapper, Payload};

pub const LD_JSON: &str = "application/ld+json";
pub const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

/// How the response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    /// Return the body untouched as [`Payload::Raw`].
    Text,
}

/// Per-request inputs to [`BridgeHttpClient::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub body: Payload,
    pub timeout_ms: Option<i64>,
    pub response_type: Option<ResponseType>,
}

pub struct BridgeHttpClient {
    transport: Arc<dyn HttpTransport>,
    options: BridgeOptions,
}

impl BridgeHttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>, options: BridgeOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Execute one call against an already resolved `url`.
    ///
    /// Returns [`Payload::Raw`] for text responses and
    /// [`Payload::Structured`] otherwise.
    pub fn request(&self, method: HttpMethod, url: &str, options: RequestOptions) -> Result<Payload> {
        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: self.build_headers(&options.headers, method),
            body: options.body.encode()?,
            timeout: effective_timeout(options.timeout_ms, self.options.defaults().timeout_ms),
        };

        if self.options.debug() {
            debug!(%method, url, "[Bridge] request");
        }

        let response = self.transport.execute(&request)?;
        let status = response.status;

        if self.options.debug() {
            debug!(%method, url, status, "[Bridge] response");
        }

        if options.response_type == Some(ResponseType::Text) {
            if status >= 400 {
                return Err(ApiError::from_payload(status, raw_wrapper(&response.body)).into());
            }
            return Ok(Payload::Raw(response.body));
        }

        let payload = decode_json(&response.body);
        if status >= 400 {
            return Err(ApiError::from_payload(status, payload).into());
        }
        Ok(Payload::Structured(payload))
    }

    fn build_headers(&self, headers: &[(String, String)], method: HttpMethod) -> Vec<(String, String)> {
        let mut merged = merge_headers(&self.options.defaults().headers, headers);

        if !has_header(&merged, "Accept") {
            set_header(&mut merged, "Accept", LD_JSON);
        }

        if let Some(token) = self.options.token() {
            if !has_header(&merged, "Authorization") {
                set_header(&mut merged, "Authorization", format!("Bearer {token}"));
            }
        }

        if method.has_body() && !has_header(&merged, "Content-Type") {
            let content_type = if method == HttpMethod::Patch { MERGE_PATCH_JSON } else { LD_JSON };
            set_header(&mut merged, "Content-Type", content_type);
        }

        merged
    }
}

fn effective_timeout(call: Option<i64>, default: Option<i64>) -> Option<Duration> {
    call.or(default)
        .filter(|ms| *ms > 0)
        .map(|ms| Duration::from_millis(ms as u64))
}
