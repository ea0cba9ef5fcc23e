//! Client library for a cookie-session auth service and its JSON-LD API.
//!
//! # Overview
//! - [`SessionAuthClient`] drives the login, refresh, logout, registration
//!   and password-reset flows. It carries session cookies between calls and
//!   attaches CSRF tokens to mutating requests.
//! - [`bridge`] is the generic authenticated request pipeline (bearer token,
//!   content negotiation, timeouts, error mapping) plus typed resource
//!   facades that hydrate items and paginated collections.
//!
//! # Design
//! - The network is reached only through an injected [`HttpTransport`];
//!   there is no default client.
//! - Bodies are a tagged [`Payload`]; undecodable JSON degrades to
//!   `{"raw": text}` instead of failing.
//! - Every status >= 400 surfaces as an error carrying status and body.

pub mod bridge;
pub mod cookie;
pub mod csrf;
pub mod error;
pub mod http;
pub mod payload;
pub mod query;
pub mod session;
pub mod types;
pub mod url;
pub mod users;

#[cfg(test)]
mod testing;

pub use bridge::{
    BridgeConfig, BridgeDefaults, BridgeFacade, BridgeHttpClient, BridgeOptions, Collection, FacadeFactory,
    HttpCallOptions, HttpRequestConfig, ResourceFacade, ResponseType, SerializerContext,
};
pub use cookie::CookieJar;
pub use csrf::CsrfStrategy;
pub use error::{ApiError, Error, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use payload::{JsonMap, Payload};
pub use session::{SessionAuthClient, SessionConfig};
pub use types::{
    FrontendConfig, InviteCompleteInput, InvitePreview, InviteRead, Item, LoginResponse, PasswordResetInput,
    RegisterUserInput, ResourceContext, ResourceEnvelope, ResourceType, UpdateUserRolesInput, UserRead,
};
pub use users::UsersEndpoint;
