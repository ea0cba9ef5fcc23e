//! Cookie and CSRF aware session client for the auth endpoints.
//!
//! # Design
//! `SessionAuthClient` owns one [`CookieJar`] for its whole lifetime. Every
//! request carries the jar as a `Cookie` header, and every response,
//! including failed ones, feeds its `Set-Cookie` headers back into the jar so
//! the server can rotate the session on any call.
//!
//! Calls take `&mut self`: one client is one session and its calls are
//! strictly sequential. Use one client per session when running several.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cookie::CookieJar;
use crate::csrf::{generate_token, CsrfStrategy};
use crate::error::{Error, Result};
use crate::http::{set_header, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::payload::{decode_json, JsonMap};
use crate::url;

const PATH_CSRF: &str = "/api/auth/csrf";
const PATH_ME: &str = "/api/auth/me";
const PATH_LOGIN: &str = "/api/login";
const PATH_REFRESH: &str = "/api/token/refresh";
const PATH_LOGOUT: &str = "/api/auth/logout";
const PATH_REGISTER: &str = "/api/auth/register";
const PATH_PASSWORD_REQUEST: &str = "/reset-password";
const PATH_PASSWORD_RESET: &str = "/reset-password/reset";

/// Session client configuration section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub base_url: String,
    pub csrf_strategy: CsrfStrategy,
    /// Overrides the strategy's default header name.
    pub csrf_header: Option<String>,
    /// Sent as `Origin` for servers validating CSRF by origin.
    pub origin: Option<String>,
    pub timeout_ms: Option<i64>,
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: CsrfStrategy) -> Self {
        self.csrf_strategy = strategy;
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

pub struct SessionAuthClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    strategy: CsrfStrategy,
    csrf_header: String,
    origin: Option<String>,
    timeout: Option<Duration>,
    jar: CookieJar,
}

impl SessionAuthClient {
    /// Fails with [`Error::Configuration`] when `base_url` is blank.
    pub fn new(transport: Arc<dyn HttpTransport>, config: SessionConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Configuration("session base_url is required".to_string()));
        }
        let csrf_header = config
            .csrf_header
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| config.csrf_strategy.default_header().to_string());

        Ok(Self {
            transport,
            base_url,
            strategy: config.csrf_strategy,
            csrf_header,
            origin: config.origin.filter(|origin| !origin.is_empty()),
            timeout: config
                .timeout_ms
                .filter(|ms| *ms > 0)
                .map(|ms| Duration::from_millis(ms as u64)),
            jar: CookieJar::new(),
        })
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    /// For pre-seeding cookies, e.g. a session restored by the caller.
    pub fn jar_mut(&mut self) -> &mut CookieJar {
        &mut self.jar
    }

    pub fn csrf_strategy(&self) -> CsrfStrategy {
        self.strategy
    }

    pub fn csrf_header(&self) -> &str {
        &self.csrf_header
    }

    /// `GET /api/auth/csrf/{token_id}`; the response must carry a non-empty
    /// string `token`.
    pub fn fetch_csrf_token(&mut self, token_id: &str) -> Result<String> {
        let path = format!("{PATH_CSRF}/{}", urlencoding::encode(token_id));
        let response = self.request(HttpMethod::Get, &path, None, None)?;
        let payload = ensure_ok("csrf", &response)?;

        match payload.get("token") {
            Some(Value::String(token)) if !token.is_empty() => Ok(token.clone()),
            _ => Err(Error::Protocol("csrf_invalid_payload".to_string())),
        }
    }

    /// `GET /api/auth/me`.
    pub fn me(&mut self) -> Result<JsonMap> {
        let response = self.request(HttpMethod::Get, PATH_ME, None, None)?;
        ensure_ok("me", &response)
    }

    /// `POST /api/login`. The payload is the raw `{user, exp}` map; see
    /// [`LoginResponse::from_payload`](crate::types::LoginResponse::from_payload).
    pub fn login(&mut self, email: &str, password: &str, csrf: Option<&str>) -> Result<JsonMap> {
        let csrf = self.resolve_csrf("login", csrf, true)?;
        let body = string_fields(&[("email", email), ("password", password)]);
        let response = self.request(HttpMethod::Post, PATH_LOGIN, Some(body), csrf.as_deref())?;
        ensure_ok("login", &response)
    }

    /// `POST /api/token/refresh`. CSRF is optional here.
    pub fn refresh(&mut self, csrf: Option<&str>) -> Result<JsonMap> {
        let csrf = self.resolve_csrf("refresh", csrf, false)?;
        let response = self.request(HttpMethod::Post, PATH_REFRESH, None, csrf.as_deref())?;
        ensure_ok("refresh", &response)
    }

    /// `POST /api/auth/logout`.
    pub fn logout(&mut self, csrf: Option<&str>) -> Result<()> {
        let csrf = self.resolve_csrf("logout", csrf, true)?;
        let response = self.request(HttpMethod::Post, PATH_LOGOUT, None, csrf.as_deref())?;
        ensure_ok("logout", &response).map(drop)
    }

    /// `POST /api/auth/register`.
    pub fn register<P: Serialize + ?Sized>(&mut self, input: &P, csrf: Option<&str>) -> Result<JsonMap> {
        let body = match serde_json::to_value(input)? {
            Value::Object(map) => map,
            _ => return Err(Error::Protocol("register input must serialize to a map".to_string())),
        };
        let csrf = self.resolve_csrf("register", csrf, true)?;
        let response = self.request(HttpMethod::Post, PATH_REGISTER, Some(body), csrf.as_deref())?;
        ensure_ok("register", &response)
    }

    /// `POST /reset-password`.
    pub fn password_request(&mut self, email: &str, csrf: Option<&str>) -> Result<JsonMap> {
        let csrf = self.resolve_csrf("password_request", csrf, true)?;
        let body = string_fields(&[("email", email)]);
        let response = self.request(HttpMethod::Post, PATH_PASSWORD_REQUEST, Some(body), csrf.as_deref())?;
        ensure_ok("password_request", &response)
    }

    /// `POST /reset-password/reset`.
    pub fn password_reset(&mut self, token: &str, password: &str, csrf: Option<&str>) -> Result<()> {
        let csrf = self.resolve_csrf("password_reset", csrf, true)?;
        let body = string_fields(&[("token", token), ("password", password)]);
        let response = self.request(HttpMethod::Post, PATH_PASSWORD_RESET, Some(body), csrf.as_deref())?;
        ensure_ok("password_reset", &response).map(drop)
    }

    fn resolve_csrf(&self, endpoint: &'static str, csrf: Option<&str>, required: bool) -> Result<Option<String>> {
        if let Some(token) = csrf.filter(|token| !token.is_empty()) {
            return Ok(Some(token.to_string()));
        }
        match self.strategy {
            CsrfStrategy::ClientGenerated => Ok(Some(generate_token())),
            CsrfStrategy::ServerIssued if required => Err(Error::CsrfRequired(endpoint)),
            CsrfStrategy::ServerIssued => Ok(None),
        }
    }

    fn request(
        &mut self,
        method: HttpMethod,
        path: &str,
        body: Option<JsonMap>,
        csrf: Option<&str>,
    ) -> Result<HttpResponse> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(origin) = &self.origin {
            set_header(&mut headers, "Origin", origin.as_str());
        }
        if let Some(token) = csrf {
            set_header(&mut headers, &self.csrf_header, token);
        }
        let cookie = self.jar.to_header();
        if !cookie.is_empty() {
            set_header(&mut headers, "Cookie", cookie);
        }

        let request = HttpRequest {
            method,
            url: url::resolve(&self.base_url, path),
            headers,
            body: body.map(|map| serde_json::to_string(&map)).transpose()?,
            timeout: self.timeout,
        };

        debug!(%method, path, "session request");
        let response = self.transport.execute(&request)?;
        self.jar.add_from_set_cookie(response.header_values("set-cookie"));
        Ok(response)
    }
}

/// Status >= 400 fails with an endpoint-tagged error; 204 and every other
/// status below 400 succeed.
fn ensure_ok(endpoint: &'static str, response: &HttpResponse) -> Result<JsonMap> {
    let body = decode_json(&response.body);
    if response.status >= 400 {
        warn!(endpoint, status = response.status, "session call failed");
        return Err(Error::Endpoint {
            endpoint,
            status: response.status,
            body,
        });
    }
    Ok(body)
}

fn string_fields(fields: &[(&str, &str)]) -> JsonMap {
    fields
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from(*value)))
        .collect()
}
