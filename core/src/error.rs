//! Error types for the auth bridge.
//!
//! # Design
//! HTTP failures are not split into 4xx/5xx variants: every status >= 400
//! coming back through the bridge becomes an [`ApiError`] carrying the numeric
//! status and the decoded body, and callers branch on `status`. The session
//! client reports failures per endpoint (`login_failed: 401`) through
//! [`Error::Endpoint`]. A response whose shape breaks the expected contract
//! (missing CSRF token, a list where an item was expected) is a
//! [`Error::Protocol`] and is never coerced into a default value.

use serde_json::Value;
use thiserror::Error;

use crate::payload::JsonMap;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the session client, the bridge and resource facades.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid client configuration, detected at construction time.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The transport failed to complete the round-trip (network, timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a status >= 400 on a bridge call.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A session endpoint answered with a status >= 400.
    #[error("{endpoint}_failed: {status}")]
    Endpoint {
        endpoint: &'static str,
        status: u16,
        body: JsonMap,
    },

    /// The response did not have the shape the call requires.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A mutating session call was made without a CSRF token while the
    /// client is configured for server-issued tokens.
    #[error("{0} requires a CSRF token")]
    CsrfRequired(&'static str),

    /// A payload could not be converted to or from its typed model.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status attached to the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            Error::Endpoint { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A status >= 400 together with whatever body the server sent.
///
/// `body` is the decoded JSON object when the server sent one, otherwise
/// `{"raw": "<response text>"}`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("HTTP {status}{}", detail_suffix(.body))]
pub struct ApiError {
    pub status: u16,
    pub body: JsonMap,
}

impl ApiError {
    pub fn from_payload(status: u16, body: JsonMap) -> Self {
        Self { status, body }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Human-readable message from the usual problem+json / hydra fields.
    pub fn detail(&self) -> Option<&str> {
        ["detail", "hydra:description", "description", "message", "title"]
            .iter()
            .find_map(|key| self.body.get(*key).and_then(Value::as_str))
    }

    /// Raw response text when the body could not be decoded as JSON.
    pub fn raw(&self) -> Option<&str> {
        self.body.get("raw").and_then(Value::as_str)
    }
}

fn detail_suffix(body: &JsonMap) -> String {
    match body.get("detail").and_then(Value::as_str) {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}

/// Failures raised by an [`HttpTransport`](crate::http::HttpTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn api_error_display_includes_detail() {
        let err = ApiError::from_payload(404, body(json!({"detail": "not found"})));
        assert_eq!(err.to_string(), "HTTP 404: not found");
        assert!(err.is_not_found());
        assert_eq!(err.detail(), Some("not found"));
    }

    #[test]
    fn api_error_exposes_raw_text() {
        let err = ApiError::from_payload(500, body(json!({"raw": "boom"})));
        assert_eq!(err.to_string(), "HTTP 500");
        assert_eq!(err.raw(), Some("boom"));
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn endpoint_error_is_tagged() {
        let err = Error::Endpoint {
            endpoint: "login",
            status: 401,
            body: JsonMap::new(),
        };
        assert_eq!(err.to_string(), "login_failed: 401");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn hydra_description_is_a_detail() {
        let err = ApiError::from_payload(422, body(json!({"hydra:description": "email: invalid"})));
        assert_eq!(err.detail(), Some("email: invalid"));
    }
}
