//! Untyped bridge operations.
//!
//! `BridgeFacade` resolves a request config against the base URL, serializes
//! the query, applies per-call overrides and hands the result to
//! [`BridgeHttpClient`].

use std::sync::Arc;

use crate::bridge::client::{BridgeHttpClient, RequestOptions, ResponseType};
use crate::error::Result;
use crate::http::{merge_headers, HttpMethod};
use crate::payload::{JsonMap, Payload};
use crate::{query, url};

/// One logical call: method, absolute or base-relative url, query, body.
#[derive(Debug, Clone)]
pub struct HttpRequestConfig {
    pub method: HttpMethod,
    pub url: String,
    pub query: JsonMap,
    pub body: Payload,
    pub headers: Vec<(String, String)>,
    pub response_type: Option<ResponseType>,
    pub timeout_ms: Option<i64>,
}

impl HttpRequestConfig {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: JsonMap::new(),
            body: Payload::Absent,
            headers: Vec::new(),
            response_type: None,
            timeout_ms: None,
        }
    }

    pub fn with_query(mut self, query: JsonMap) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: impl Into<Payload>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Caller overrides for a single call. Set values win over the config.
#[derive(Debug, Clone, Default)]
pub struct HttpCallOptions {
    pub headers: Vec<(String, String)>,
    pub timeout_ms: Option<i64>,
    pub response_type: Option<ResponseType>,
}

#[derive(Clone)]
pub struct BridgeFacade {
    http: Arc<BridgeHttpClient>,
}

impl BridgeFacade {
    pub fn new(http: Arc<BridgeHttpClient>) -> Self {
        Self { http }
    }

    pub fn get(&self, url: &str, opts: Option<&HttpCallOptions>) -> Result<Payload> {
        self.request(HttpRequestConfig::new(HttpMethod::Get, url), opts)
    }

    pub fn get_collection(&self, url: &str, query: JsonMap, opts: Option<&HttpCallOptions>) -> Result<Payload> {
        self.request(HttpRequestConfig::new(HttpMethod::Get, url).with_query(query), opts)
    }

    pub fn post(&self, url: &str, payload: impl Into<Payload>, opts: Option<&HttpCallOptions>) -> Result<Payload> {
        self.request(HttpRequestConfig::new(HttpMethod::Post, url).with_body(payload), opts)
    }

    pub fn patch(&self, url: &str, changes: impl Into<Payload>, opts: Option<&HttpCallOptions>) -> Result<Payload> {
        self.request(HttpRequestConfig::new(HttpMethod::Patch, url).with_body(changes), opts)
    }

    pub fn put(&self, url: &str, payload: impl Into<Payload>, opts: Option<&HttpCallOptions>) -> Result<Payload> {
        self.request(HttpRequestConfig::new(HttpMethod::Put, url).with_body(payload), opts)
    }

    pub fn delete(&self, url: &str, opts: Option<&HttpCallOptions>) -> Result<Payload> {
        self.request(HttpRequestConfig::new(HttpMethod::Delete, url), opts)
    }

    pub fn request(&self, req: HttpRequestConfig, opts: Option<&HttpCallOptions>) -> Result<Payload> {
        let resolved = url::resolve(self.http.options().base_url(), &req.url);
        let final_url = url::append_query(&resolved, &query::build(&req.query));

        let (headers, timeout_ms, response_type) = match opts {
            Some(opts) => (
                merge_headers(&req.headers, &opts.headers),
                opts.timeout_ms.or(req.timeout_ms),
                opts.response_type.or(req.response_type),
            ),
            None => (req.headers, req.timeout_ms, req.response_type),
        };

        self.http.request(
            req.method,
            &final_url,
            RequestOptions {
                headers,
                body: req.body,
                timeout_ms,
                response_type,
            },
        )
    }
}
