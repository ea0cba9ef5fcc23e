//! Deterministic query-string serialization.
//!
//! Key order is fixed so equal queries always produce equal URLs: `page`,
//! then `itemsPerPage`, then the entries of the `filters` sub-map as
//! top-level keys, then every other key in insertion order. Null values are
//! dropped, lists repeat their key, booleans render as `true`/`false`, and
//! keys and values are percent-encoded per RFC 3986.

use serde_json::Value;

use crate::payload::JsonMap;

const PAGE: &str = "page";
const ITEMS_PER_PAGE: &str = "itemsPerPage";
const FILTERS: &str = "filters";

/// Serialize `query` into an `&`-joined query string without a leading `?`.
pub fn build(query: &JsonMap) -> String {
    let mut parts = Vec::new();
    let mut consumed: Vec<&str> = Vec::new();

    for key in [PAGE, ITEMS_PER_PAGE] {
        if let Some(value) = query.get(key) {
            push_param(&mut parts, key, value);
            consumed.push(key);
        }
    }

    if let Some(Value::Object(filters)) = query.get(FILTERS) {
        consumed.push(FILTERS);
        for (key, value) in filters {
            push_param(&mut parts, key, value);
        }
    }

    for (key, value) in query {
        if consumed.contains(&key.as_str()) {
            continue;
        }
        push_param(&mut parts, key, value);
    }

    parts.join("&")
}

fn push_param(parts: &mut Vec<String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(entries) => {
            for entry in entries {
                push_param(parts, key, entry);
            }
        }
        // Nested maps outside `filters` contribute their values under the
        // parent key.
        Value::Object(entries) => {
            for entry in entries.values() {
                push_param(parts, key, entry);
            }
        }
        Value::Bool(flag) => parts.push(pair(key, if *flag { "true" } else { "false" })),
        Value::Number(number) => parts.push(pair(key, &number.to_string())),
        Value::String(text) => parts.push(pair(key, text)),
    }
}

fn pair(key: &str, value: &str) -> String {
    format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
}
