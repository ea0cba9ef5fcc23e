//! Resource models for the auth service.
//!
//! # Design
//! JSON-LD reserved fields (`@id`, `@type`, `@context`) live in
//! [`ResourceEnvelope`]; the domain fields of each resource live in their own
//! flat struct. [`Item<T>`] composes the two. Hydration reads the same keyed
//! structure twice, once for the envelope and once for the domain struct,
//! so domain structs never declare the reserved keys.
//!
//! Domain fields are optional: `None` means the server did not send the field.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::payload::JsonMap;

/// `@type`: a single type name or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceType {
    Single(String),
    List(Vec<Value>),
}

impl ResourceType {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(ResourceType::Single(name.clone())),
            Value::Array(names) => Some(ResourceType::List(names.clone())),
            _ => None,
        }
    }
}

/// `@context`: an IRI or an inline context document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceContext {
    Iri(String),
    Inline(JsonMap),
}

impl ResourceContext {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(iri) => Some(ResourceContext::Iri(iri.clone())),
            Value::Object(doc) => Some(ResourceContext::Inline(doc.clone())),
            _ => None,
        }
    }
}

/// Protocol-reserved fields shared by every resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceEnvelope {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub iri: Option<String>,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceType>,
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<ResourceContext>,
}

impl ResourceEnvelope {
    pub fn from_map(map: &JsonMap) -> Self {
        Self {
            iri: map.get("@id").and_then(Value::as_str).map(str::to_string),
            kind: map.get("@type").and_then(ResourceType::from_value),
            context: map.get("@context").and_then(ResourceContext::from_value),
        }
    }
}

/// A hydrated resource: envelope plus domain fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item<T> {
    #[serde(flatten)]
    pub envelope: ResourceEnvelope,
    #[serde(flatten)]
    pub data: T,
}

impl<T: DeserializeOwned> Item<T> {
    pub fn from_map(map: &JsonMap) -> Result<Self> {
        let envelope = ResourceEnvelope::from_map(map);
        let data = serde_json::from_value(Value::Object(map.clone()))?;
        Ok(Self { envelope, data })
    }
}

impl<T> std::ops::Deref for Item<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRead {
    pub id: Option<i64>,
    #[serde(default)]
    pub email: String,
    pub roles: Option<Vec<String>>,
    pub email_verified: Option<bool>,
    pub last_login_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendConfig {
    pub id: Option<String>,
    pub registration_enabled: Option<bool>,
    pub password_strength_level: Option<i64>,
    pub branding_name: Option<String>,
    pub frontend_redirect_url: Option<String>,
    pub environment: Option<String>,
    pub theme_mode: Option<String>,
    pub theme_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreview {
    pub token: Option<String>,
    pub email: Option<String>,
    pub accepted: Option<bool>,
    pub expired: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRead {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub expires_at: Option<String>,
    pub accepted_at: Option<String>,
}

/// Body of `POST /api/auth/register` and the initial-setup registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUserInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCompleteInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRolesInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// Identity returned by `POST /api/login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub roles: Vec<String>,
    pub email_verified: Option<bool>,
    pub last_login_at: Option<String>,
}

/// Normalized login response: `{user, exp}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    pub user: AuthUser,
    pub exp: i64,
}

impl LoginResponse {
    /// Coerce a loosely typed login payload. Missing fields take defaults
    /// (`id` 0, empty email and roles, `exp` 0); `isEmailVerified` is
    /// accepted as an alias of `emailVerified`.
    pub fn from_payload(payload: &JsonMap) -> Self {
        let empty = JsonMap::new();
        let user = payload.get("user").and_then(Value::as_object).unwrap_or(&empty);

        let roles = user
            .get("roles")
            .and_then(Value::as_array)
            .map(|roles| roles.iter().map(scalar_to_string).collect())
            .unwrap_or_default();

        let email_verified = user
            .get("emailVerified")
            .filter(|v| !v.is_null())
            .or_else(|| user.get("isEmailVerified"))
            .and_then(truthy);

        Self {
            user: AuthUser {
                id: user.get("id").map(to_int).unwrap_or(0),
                email: user.get("email").map(scalar_to_string).unwrap_or_default(),
                roles,
                email_verified,
                last_login_at: user
                    .get("lastLoginAt")
                    .filter(|v| !v.is_null())
                    .map(scalar_to_string),
            },
            exp: payload.get("exp").map(to_int).unwrap_or(0),
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn to_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        Value::Bool(flag) => i64::from(*flag),
        _ => 0,
    }
}

fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(*flag),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(text) => Some(!text.is_empty() && text != "0"),
        Value::Array(items) => Some(!items.is_empty()),
        Value::Object(_) => Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn item_hydrates_envelope_and_domain() {
        let payload = map(json!({
            "@context": "/api/contexts/User",
            "@id": "/api/users/7",
            "@type": "User",
            "id": 7,
            "email": "ada@example.com",
            "roles": ["ROLE_USER"],
            "emailVerified": true
        }));
        let user: Item<UserRead> = Item::from_map(&payload).unwrap();
        assert_eq!(user.envelope.iri.as_deref(), Some("/api/users/7"));
        assert_eq!(user.envelope.kind, Some(ResourceType::Single("User".into())));
        assert_eq!(user.envelope.context, Some(ResourceContext::Iri("/api/contexts/User".into())));
        assert_eq!(user.id, Some(7));
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.last_login_at, None);
    }

    #[test]
    fn list_type_and_inline_context() {
        let payload = map(json!({
            "@type": ["User", "Person"],
            "@context": {"@vocab": "https://schema.org/"}
        }));
        let envelope = ResourceEnvelope::from_map(&payload);
        assert_eq!(envelope.kind, Some(ResourceType::List(vec![json!("User"), json!("Person")])));
        assert!(matches!(envelope.context, Some(ResourceContext::Inline(_))));
        assert_eq!(envelope.iri, None);
    }

    #[test]
    fn item_serializes_flat() {
        let item = Item {
            envelope: ResourceEnvelope {
                iri: Some("/api/frontend_config".into()),
                ..Default::default()
            },
            data: InvitePreview {
                token: Some("t".into()),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["@id"], "/api/frontend_config");
        assert_eq!(value["token"], "t");
        assert!(value.get("@type").is_none());
    }

    #[test]
    fn login_response_coerces_loose_payload() {
        let payload = map(json!({
            "user": {
                "id": "12",
                "email": "bob@example.com",
                "roles": ["ROLE_USER", 3],
                "isEmailVerified": 1,
                "lastLoginAt": "2024-05-01T10:00:00+00:00"
            },
            "exp": 1714557600
        }));
        let login = LoginResponse::from_payload(&payload);
        assert_eq!(login.user.id, 12);
        assert_eq!(login.user.roles, vec!["ROLE_USER".to_string(), "3".to_string()]);
        assert_eq!(login.user.email_verified, Some(true));
        assert_eq!(login.user.last_login_at.as_deref(), Some("2024-05-01T10:00:00+00:00"));
        assert_eq!(login.exp, 1714557600);
    }

    #[test]
    fn login_response_defaults() {
        let login = LoginResponse::from_payload(&JsonMap::new());
        assert_eq!(login, LoginResponse::default());
        assert_eq!(login.user.email_verified, None);
    }

    #[test]
    fn register_input_omits_unset_fields() {
        let input = RegisterUserInput {
            email: Some("new@example.com".into()),
            password: None,
        };
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({"email": "new@example.com"}));
    }
}
