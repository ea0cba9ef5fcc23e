//! Typed CRUD and collection operations over one resource URL.
//!
//! # Design
//! `ResourceFacade<T>` pairs a resource URL with a model type. Outgoing typed
//! payloads are normalized to a keyed structure through [`Serializer`];
//! incoming keyed structures are hydrated into [`Item<T>`]. A response that
//! is not a keyed structure where an item or collection is expected is a
//! contract violation with the server and fails the call.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::bridge::collection::Collection;
use crate::bridge::facade::{BridgeFacade, HttpCallOptions, HttpRequestConfig};
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::payload::{JsonMap, Payload};
use crate::types::Item;

/// Options for normalization and hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerContext {
    /// Accept payload keys the model does not declare. On by default so
    /// newer server payloads keep hydrating.
    pub allow_extra_attributes: bool,
}

impl Default for SerializerContext {
    fn default() -> Self {
        Self {
            allow_extra_attributes: true,
        }
    }
}

/// Converts between typed models and keyed structures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serializer {
    context: SerializerContext,
}

impl Serializer {
    pub fn new(context: SerializerContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> SerializerContext {
        self.context
    }

    pub fn normalize<P: Serialize + ?Sized>(&self, payload: &P) -> Result<JsonMap> {
        match serde_json::to_value(payload)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Protocol(format!(
                "serializer returned a non-map payload ({})",
                json_kind(&other)
            ))),
        }
    }

    pub fn denormalize<T: Serialize + DeserializeOwned>(&self, map: &JsonMap) -> Result<Item<T>> {
        let item = Item::<T>::from_map(map)?;
        if !self.context.allow_extra_attributes {
            self.reject_extra_attributes(map, &item.data)?;
        }
        Ok(item)
    }

    // Keys the model consumed show up again when it is normalized; anything
    // else (except JSON-LD `@` keys and explicit nulls) was extra.
    fn reject_extra_attributes<T: Serialize>(&self, map: &JsonMap, data: &T) -> Result<()> {
        let known = self.normalize(data)?;
        let extra: Vec<&str> = map
            .iter()
            .filter(|(key, value)| !key.starts_with('@') && !value.is_null() && !known.contains_key(*key))
            .map(|(key, _)| key.as_str())
            .collect();
        if extra.is_empty() {
            Ok(())
        } else {
            Err(Error::Protocol(format!("unexpected attributes: {}", extra.join(", "))))
        }
    }
}

pub struct ResourceFacade<T> {
    bridge: BridgeFacade,
    serializer: Serializer,
    resource_url: String,
    model: PhantomData<fn() -> T>,
}

impl<T> ResourceFacade<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(bridge: BridgeFacade, resource_url: impl Into<String>, context: SerializerContext) -> Self {
        Self {
            bridge,
            serializer: Serializer::new(context),
            resource_url: resource_url.into(),
            model: PhantomData,
        }
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// GET the resource URL and hydrate `member` (or `items`) rows. Rows that
    /// are not objects are skipped.
    pub fn get_collection(&self, query: JsonMap, opts: Option<&HttpCallOptions>) -> Result<Collection<Item<T>>> {
        let req = HttpRequestConfig::new(HttpMethod::Get, self.resource_url.as_str()).with_query(query);
        let payload = self.bridge.request(req, opts)?.into_structured("collection hydration")?;
        self.hydrate_collection(&payload)
    }

    pub fn get(&self, iri: &str, opts: Option<&HttpCallOptions>) -> Result<Item<T>> {
        let response = self.bridge.get(iri, opts)?;
        self.hydrate_item(response)
    }

    pub fn post<P: Serialize + ?Sized>(&self, payload: &P, opts: Option<&HttpCallOptions>) -> Result<Item<T>> {
        let body = self.serializer.normalize(payload)?;
        let response = self.bridge.post(&self.resource_url, body, opts)?;
        self.hydrate_item(response)
    }

    pub fn patch<P: Serialize + ?Sized>(&self, iri: &str, changes: &P, opts: Option<&HttpCallOptions>) -> Result<Item<T>> {
        let body = self.serializer.normalize(changes)?;
        let response = self.bridge.patch(iri, body, opts)?;
        self.hydrate_item(response)
    }

    pub fn put<P: Serialize + ?Sized>(&self, iri: &str, payload: &P, opts: Option<&HttpCallOptions>) -> Result<Item<T>> {
        let body = self.serializer.normalize(payload)?;
        let response = self.bridge.put(iri, body, opts)?;
        self.hydrate_item(response)
    }

    pub fn delete(&self, iri: &str, opts: Option<&HttpCallOptions>) -> Result<()> {
        self.bridge.delete(iri, opts)?;
        Ok(())
    }

    /// Arbitrary call through the same header, timeout and error pipeline.
    pub fn request(&self, req: HttpRequestConfig, opts: Option<&HttpCallOptions>) -> Result<Payload> {
        self.bridge.request(req, opts)
    }

    fn hydrate_item(&self, payload: Payload) -> Result<Item<T>> {
        let map = payload.into_structured("item hydration")?;
        self.serializer.denormalize(&map)
    }

    fn hydrate_collection(&self, payload: &JsonMap) -> Result<Collection<Item<T>>> {
        let rows: &[Value] = match (payload.get("member"), payload.get("items")) {
            (Some(Value::Array(rows)), _) => rows.as_slice(),
            (_, Some(Value::Array(rows))) => rows.as_slice(),
            _ => &[],
        };

        let items = rows
            .iter()
            .filter_map(Value::as_object)
            .map(|row| self.serializer.denormalize::<T>(row))
            .collect::<Result<Vec<_>>>()?;

        Ok(Collection::from_envelope(items, payload))
    }
}

/// Builds resource facades that share one bridge.
#[derive(Clone)]
pub struct FacadeFactory {
    bridge: BridgeFacade,
}

impl FacadeFactory {
    pub fn new(bridge: BridgeFacade) -> Self {
        Self { bridge }
    }

    pub fn create<T>(&self, url: impl Into<String>, context: SerializerContext) -> ResourceFacade<T>
    where
        T: Serialize + DeserializeOwned,
    {
        ResourceFacade::new(self.bridge.clone(), url, context)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::client::BridgeHttpClient;
    use crate::bridge::options::BridgeOptions;
    use crate::testing::RecordingTransport;
    use crate::types::{ResourceType, UserRead};
    use serde_json::json;
    use std::sync::Arc;

    fn factory(transport: &Arc<RecordingTransport>) -> FacadeFactory {
        let options = BridgeOptions::new("https://api.test").unwrap();
        let http = BridgeHttpClient::new(transport.clone(), options);
        FacadeFactory::new(BridgeFacade::new(Arc::new(http)))
    }

    fn users(transport: &Arc<RecordingTransport>) -> ResourceFacade<UserRead> {
        factory(transport).create("/api/users", SerializerContext::default())
    }

    #[test]
    fn collection_from_member() {
        let transport = RecordingTransport::replying(200, r#"{"member":[{"id":1}],"totalItems":1}"#);
        let collection = users(&transport).get_collection(JsonMap::new(), None).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.items()[0].id, Some(1));
        assert_eq!(collection.total_items(), Some(1));
        assert_eq!(transport.last_request().url, "https://api.test/api/users");
    }

    #[test]
    fn collection_without_rows_is_empty() {
        let transport = RecordingTransport::replying(200, r#"{"totalItems":0}"#);
        let collection = users(&transport).get_collection(JsonMap::new(), None).unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.total_items(), Some(0));
    }

    #[test]
    fn collection_falls_back_to_items_and_skips_scalars() {
        let transport = RecordingTransport::replying(
            200,
            r#"{"items":[{"id":2,"email":"b@x.io"},"junk",3,{"id":4}],"totalItems":"2"}"#,
        );
        let collection = users(&transport).get_collection(JsonMap::new(), None).unwrap();
        let ids: Vec<_> = collection.iter().map(|user| user.id).collect();
        assert_eq!(ids, vec![Some(2), Some(4)]);
        assert_eq!(collection.total_items(), Some(2));
    }

    #[test]
    fn collection_envelope_metadata() {
        let transport = RecordingTransport::replying(
            200,
            r#"{
                "@context": {"@vocab": "https://api.test/docs"},
                "@id": "/api/users",
                "@type": "Collection",
                "member": [],
                "view": {"@id": "/api/users?page=1", "next": "/api/users?page=2"},
                "search": {"template": "/api/users{?email}"}
            }"#,
        );
        let collection = users(&transport).get_collection(JsonMap::new(), None).unwrap();
        assert_eq!(collection.id(), Some("/api/users"));
        assert_eq!(collection.kind(), Some(&ResourceType::Single("Collection".into())));
        assert_eq!(collection.context().unwrap()["@vocab"], "https://api.test/docs");
        assert_eq!(collection.view().unwrap()["next"], "/api/users?page=2");
        assert!(collection.search().is_some());
        assert_eq!(collection.total_items(), None);
    }

    #[test]
    fn collection_iri_context_is_not_kept() {
        let transport = RecordingTransport::replying(200, r#"{"@context":"/api/contexts/User","member":[{"id":1}]}"#);
        let collection = users(&transport).get_collection(JsonMap::new(), None).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.context(), None);
    }

    #[test]
    fn collection_query_is_serialized() {
        let transport = RecordingTransport::replying(200, "{}");
        let query = json!({"itemsPerPage": 10, "page": 2}).as_object().cloned().unwrap();
        users(&transport).get_collection(query, None).unwrap();
        assert_eq!(transport.last_request().url, "https://api.test/api/users?page=2&itemsPerPage=10");
    }

    #[test]
    fn post_normalizes_typed_payload() {
        let transport = RecordingTransport::replying(201, r#"{"@id":"/api/users/9","id":9,"email":"n@x.io"}"#);
        let input = UserRead {
            email: "n@x.io".into(),
            ..Default::default()
        };
        let created = users(&transport).post(&input, None).unwrap();
        assert_eq!(created.envelope.iri.as_deref(), Some("/api/users/9"));
        assert_eq!(created.id, Some(9));

        let sent = transport.last_request();
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "n@x.io");
        assert_eq!(sent.method, HttpMethod::Post);
    }

    #[test]
    fn patch_accepts_plain_maps() {
        let transport = RecordingTransport::replying(200, r#"{"id":3,"roles":["ROLE_ADMIN"]}"#);
        let changes = json!({"roles": ["ROLE_ADMIN"]});
        let updated = users(&transport).patch("/api/users/3", &changes, None).unwrap();
        assert_eq!(updated.roles.as_deref(), Some(&["ROLE_ADMIN".to_string()][..]));
        let sent = transport.last_request();
        assert_eq!(sent.url, "https://api.test/api/users/3");
        assert_eq!(sent.header("Content-Type"), Some("application/merge-patch+json"));
    }

    #[test]
    fn put_replaces_with_ld_json() {
        let transport = RecordingTransport::replying(200, r#"{"@id":"/api/users/5","@type":"User","id":5,"email":"p@x.io"}"#);
        let input = UserRead {
            email: "p@x.io".into(),
            roles: Some(vec!["ROLE_USER".into()]),
            ..Default::default()
        };
        let replaced = users(&transport).put("/api/users/5", &input, None).unwrap();
        assert_eq!(replaced.envelope.iri.as_deref(), Some("/api/users/5"));
        assert_eq!(replaced.id, Some(5));
        assert_eq!(replaced.email, "p@x.io");

        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.url, "https://api.test/api/users/5");
        assert_eq!(sent.header("Content-Type"), Some("application/ld+json"));
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "p@x.io");
        assert_eq!(body["roles"], json!(["ROLE_USER"]));
    }

    #[test]
    fn non_map_payload_is_rejected_before_sending() {
        let transport = RecordingTransport::replying(200, "{}");
        let err = users(&transport).put("/api/users/3", &vec![1, 2], None).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn text_item_response_is_a_protocol_violation() {
        let transport = RecordingTransport::replying(200, "ok");
        let opts = HttpCallOptions {
            response_type: Some(crate::bridge::client::ResponseType::Text),
            ..Default::default()
        };
        let err = users(&transport).get("/api/users/1", Some(&opts)).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn strict_context_rejects_unknown_fields() {
        let transport = RecordingTransport::replying(200, r#"{"@id":"/api/users/1","id":1,"email":"a@x.io","nickname":"al"}"#);
        let strict: ResourceFacade<UserRead> = factory(&transport).create(
            "/api/users",
            SerializerContext {
                allow_extra_attributes: false,
            },
        );
        let err = strict.get("/api/users/1", None).unwrap_err();
        assert!(matches!(err, Error::Protocol(msg) if msg.contains("nickname")));

        let lenient = users(&transport).get("/api/users/1", None).unwrap();
        assert_eq!(lenient.email, "a@x.io");
    }

    #[test]
    fn delete_discards_body() {
        let transport = RecordingTransport::replying(204, "");
        users(&transport).delete("/api/users/5", None).unwrap();
        assert_eq!(transport.last_request().method, HttpMethod::Delete);
    }

    #[test]
    fn api_errors_propagate() {
        let transport = RecordingTransport::replying(404, r#"{"detail":"Not Found"}"#);
        let err = users(&transport).get("/api/users/404", None).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
