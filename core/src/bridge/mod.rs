//! Generic authenticated HTTP bridge.
//!
//! - [`BridgeHttpClient`] executes one request: headers, auth, body, timeout,
//!   decoding and error mapping.
//! - [`BridgeFacade`] resolves URLs and queries and applies call overrides.
//! - [`ResourceFacade`] hydrates typed items and collections for one resource.

pub mod client;
pub mod collection;
pub mod facade;
pub mod options;
pub mod resource;

pub use client::{BridgeHttpClient, RequestOptions, ResponseType};
pub use collection::Collection;
pub use facade::{BridgeFacade, HttpCallOptions, HttpRequestConfig};
pub use options::{BridgeConfig, BridgeDefaults, BridgeOptions};
pub use resource::{FacadeFactory, ResourceFacade, Serializer, SerializerContext};
