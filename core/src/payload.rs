//! Request and response bodies.
//!
//! # Design
//! A body is either absent, raw text, or a keyed JSON structure. Every decode
//! path produces exactly one [`Payload`] variant, and consumers match on the
//! variant instead of probing the JSON shape.
//!
//! Decoding never fails: malformed JSON degrades to `{"raw": "<text>"}` so
//! status-based error handling still sees the best available data, and a
//! top-level JSON value that is not an object becomes an empty map.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Ordered JSON object.
pub type JsonMap = Map<String, Value>;

/// A request or response body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Absent,
    Raw(String),
    Structured(JsonMap),
}

impl Payload {
    pub fn is_absent(&self) -> bool {
        matches!(self, Payload::Absent)
    }

    pub fn as_structured(&self) -> Option<&JsonMap> {
        match self {
            Payload::Structured(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Raw(text) => Some(text),
            _ => None,
        }
    }

    /// Take the keyed structure, failing when the payload is anything else.
    pub fn into_structured(self, what: &str) -> Result<JsonMap> {
        match self {
            Payload::Structured(map) => Ok(map),
            Payload::Raw(_) => Err(Error::Protocol(format!(
                "expected a keyed payload for {what}, got raw text"
            ))),
            Payload::Absent => Err(Error::Protocol(format!(
                "expected a keyed payload for {what}, got no body"
            ))),
        }
    }

    /// Wire form of the body: JSON text for structured payloads.
    pub(crate) fn encode(&self) -> Result<Option<String>> {
        match self {
            Payload::Absent => Ok(None),
            Payload::Raw(text) => Ok(Some(text.clone())),
            Payload::Structured(map) => Ok(Some(serde_json::to_string(map)?)),
        }
    }
}

impl From<JsonMap> for Payload {
    fn from(map: JsonMap) -> Self {
        Payload::Structured(map)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Raw(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Raw(text.to_string())
    }
}

/// Decode a response body into a keyed structure.
pub fn decode_json(raw: &str) -> JsonMap {
    if raw.is_empty() {
        return JsonMap::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => object_or_empty(value),
        Err(_) => match serde_json::from_str::<Value>(lenient(raw)) {
            Ok(value) => object_or_empty(value),
            Err(_) => raw_wrapper(raw),
        },
    }
}

/// `{"raw": text}`.
pub fn raw_wrapper(raw: &str) -> JsonMap {
    let mut map = JsonMap::new();
    map.insert("raw".to_string(), Value::String(raw.to_string()));
    map
}

fn object_or_empty(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

// Byte order marks, stray NULs and surrounding whitespace from misbehaving
// servers.
fn lenient(raw: &str) -> &str {
    raw.trim_start_matches('\u{feff}')
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_objects() {
        let map = decode_json(r#"{"detail":"not found"}"#);
        assert_eq!(map.get("detail"), Some(&json!("not found")));
    }

    #[test]
    fn empty_body_is_empty_map() {
        assert!(decode_json("").is_empty());
    }

    #[test]
    fn non_object_json_is_empty_map() {
        assert!(decode_json("[1,2,3]").is_empty());
        assert!(decode_json("\"text\"").is_empty());
        assert!(decode_json("42").is_empty());
    }

    #[test]
    fn invalid_json_is_wrapped() {
        let map = decode_json("<html>Bad Gateway</html>");
        assert_eq!(map, raw_wrapper("<html>Bad Gateway</html>"));
    }

    #[test]
    fn bom_prefixed_json_decodes_leniently() {
        let map = decode_json("\u{feff}{\"ok\":true}\0");
        assert_eq!(map.get("ok"), Some(&json!(true)));
    }

    #[test]
    fn encode_matches_variant() {
        assert_eq!(Payload::Absent.encode().unwrap(), None);
        assert_eq!(Payload::from("a=b").encode().unwrap().as_deref(), Some("a=b"));
        let map = decode_json(r#"{"a":1}"#);
        assert_eq!(Payload::from(map).encode().unwrap().as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn raw_payload_is_not_structured() {
        let err = Payload::from("nope").into_structured("item").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
