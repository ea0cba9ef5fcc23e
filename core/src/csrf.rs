//! CSRF token strategies.
//!
//! Two server deployments exist and the client must be told which one it is
//! talking to:
//!
//! - [`CsrfStrategy::ServerIssued`]: the server hands out a token from
//!   `GET /api/auth/csrf/{id}` and checks the presented value against the one
//!   it issued. Mutating calls need a token fetched beforehand.
//! - [`CsrfStrategy::ClientGenerated`]: the client makes up a random token per
//!   call. The server only checks that a token is present (optionally
//!   mirrored in a double-submit cookie); it never compares it with an issued
//!   value, so protection rests on same-origin rules.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;

pub const SERVER_ISSUED_HEADER: &str = "X-CSRF-TOKEN";
pub const CLIENT_GENERATED_HEADER: &str = "csrf-token";

const TOKEN_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsrfStrategy {
    #[default]
    ServerIssued,
    ClientGenerated,
}

impl CsrfStrategy {
    /// Header the token travels in unless configured otherwise.
    pub fn default_header(self) -> &'static str {
        match self {
            CsrfStrategy::ServerIssued => SERVER_ISSUED_HEADER,
            CsrfStrategy::ClientGenerated => CLIENT_GENERATED_HEADER,
        }
    }
}

/// 16 bytes from the OS CSPRNG, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
