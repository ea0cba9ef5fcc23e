//! Bridge configuration.
//!
//! [`BridgeConfig`] is the loosely specified, deserializable form (from a
//! JSON or TOML config section). [`BridgeOptions`] is the validated,
//! immutable value the client is built from.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default HTTP behavior applied to every bridge request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeDefaults {
    pub headers: Vec<(String, String)>,
    /// Milliseconds; `None` or a non-positive value leaves the transport
    /// default in place.
    pub timeout_ms: Option<i64>,
}

/// Raw configuration section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub defaults: BridgeDefaults,
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    base_url: String,
    token: Option<String>,
    defaults: BridgeDefaults,
    debug: bool,
}

impl BridgeOptions {
    /// Fails with [`Error::Configuration`] when `base_url` is blank.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(BridgeConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    /// Validate a configuration section. A blank token counts as no token.
    pub fn from_config(config: BridgeConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Configuration("bridge base_url is required".to_string()));
        }
        let token = config.token.filter(|token| !token.trim().is_empty());
        Ok(Self {
            base_url: config.base_url,
            token,
            defaults: config.defaults,
            debug: config.debug,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    pub fn with_defaults(mut self, defaults: BridgeDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn defaults(&self) -> &BridgeDefaults {
        &self.defaults
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}
