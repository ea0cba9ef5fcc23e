use serde_json::Value;

use crate::payload::JsonMap;
use crate::types::ResourceType;

/// Result of a list fetch: hydrated items plus the JSON-LD envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
    total_items: Option<u64>,
    id: Option<String>,
    kind: Option<ResourceType>,
    context: Option<JsonMap>,
    view: Option<JsonMap>,
    search: Option<JsonMap>,
}

impl<T> Collection<T> {
    /// Envelope metadata is read from `payload`; `items` are already
    /// hydrated by the caller.
    pub(crate) fn from_envelope(items: Vec<T>, payload: &JsonMap) -> Self {
        Self {
            items,
            total_items: payload.get("totalItems").and_then(as_count),
            id: payload.get("@id").and_then(as_string),
            kind: payload.get("@type").and_then(ResourceType::from_value),
            context: payload.get("@context").and_then(Value::as_object).cloned(),
            view: payload.get("view").and_then(Value::as_object).cloned(),
            search: payload.get("search").and_then(Value::as_object).cloned(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn total_items(&self) -> Option<u64> {
        self.total_items
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> Option<&ResourceType> {
        self.kind.as_ref()
    }

    /// Inline `@context` document. A context given as an IRI is not kept.
    pub fn context(&self) -> Option<&JsonMap> {
        self.context.as_ref()
    }

    /// Pagination links (`first`, `last`, `next`, `previous`).
    pub fn view(&self) -> Option<&JsonMap> {
        self.view.as_ref()
    }

    pub fn search(&self) -> Option<&JsonMap> {
        self.search.as_ref()
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
