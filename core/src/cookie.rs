//! Minimal in-memory cookie jar.
//!
//! Stores only `name=value` pairs taken from `Set-Cookie` lines. Path, Expires,
//! Max-Age, HttpOnly and SameSite are ignored: the jar carries one session
//! between calls of a single client and is not an RFC 6265 store. Entries are
//! never expired or removed, only overwritten.

use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: IndexMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest raw `Set-Cookie` header values. Lines without a `name=value`
    /// first segment are skipped.
    pub fn add_from_set_cookie<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let first = line.as_ref().split(';').next().unwrap_or_default().trim();
            if let Some((name, value)) = first.split_once('=') {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// `Cookie` header value in insertion order; empty when the jar is.
    pub fn to_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
