//! `/api/users` resource endpoints.

use serde_json::Value;

use crate::bridge::{Collection, FacadeFactory, HttpRequestConfig, ResourceFacade, SerializerContext};
use crate::csrf::{generate_token, CLIENT_GENERATED_HEADER};
use crate::error::Result;
use crate::http::HttpMethod;
use crate::payload::JsonMap;
use crate::types::{Item, UserRead};

const PATH_USERS: &str = "/api/users";

pub struct UsersEndpoint {
    users: ResourceFacade<UserRead>,
}

impl UsersEndpoint {
    pub fn new(factory: &FacadeFactory) -> Self {
        Self {
            users: factory.create(PATH_USERS, SerializerContext::default()),
        }
    }

    /// `GET /api/users`, with optional pagination and filters.
    pub fn list(&self, query: JsonMap) -> Result<Collection<Item<UserRead>>> {
        self.users.get_collection(query, None)
    }

    /// `GET /api/users/{id}`.
    pub fn get(&self, id: i64) -> Result<Item<UserRead>> {
        self.users.get(&user_path(id), None)
    }

    /// `POST /api/users/{id}/roles`. Admin only; a CSRF token is generated
    /// when none is given. Returns the controller's plain JSON payload.
    pub fn update_roles<S: AsRef<str>>(&self, id: i64, roles: &[S], csrf: Option<&str>) -> Result<JsonMap> {
        let csrf = match csrf.filter(|token| !token.is_empty()) {
            Some(token) => token.to_string(),
            None => generate_token(),
        };
        let roles: Vec<&str> = roles.iter().map(|role| role.as_ref()).collect();
        let mut body = JsonMap::new();
        body.insert("roles".to_string(), Value::from(roles));

        let req = HttpRequestConfig::new(HttpMethod::Post, format!("{}/roles", user_path(id)))
            .with_header(CLIENT_GENERATED_HEADER, csrf)
            .with_body(body);
        self.users.request(req, None)?.into_structured("role update")
    }

    /// `DELETE /api/users/{id}`.
    pub fn delete(&self, id: i64) -> Result<()> {
        self.users.delete(&user_path(id), None)
    }
}

fn user_path(id: i64) -> String {
    format!("{PATH_USERS}/{id}")
}
