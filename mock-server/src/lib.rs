use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";
/// Bearer token accepted on `/api/users*`.
pub const ADMIN_TOKEN: &str = "admin-token";
pub const SESSION_COOKIE: &str = "session";
/// Fixed session expiry handed out on login and refresh.
pub const SESSION_EXP: i64 = 4_102_444_800;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub roles: Vec<String>,
    pub email_verified: bool,
    pub last_login_at: Option<String>,
}

#[derive(Debug, Default)]
pub struct AuthState {
    users: BTreeMap<i64, User>,
    sessions: HashMap<String, i64>,
    csrf_tokens: HashSet<String>,
    reset_tokens: HashMap<String, i64>,
    next_id: i64,
}

impl AuthState {
    fn seeded() -> Self {
        let mut state = Self::default();
        state.insert_user(ADMIN_EMAIL, ADMIN_PASSWORD, vec!["ROLE_ADMIN".to_string()]);
        state
    }

    fn insert_user(&mut self, email: &str, password: &str, roles: Vec<String>) -> User {
        self.next_id += 1;
        let user = User {
            id: self.next_id,
            email: email.to_string(),
            password: password.to_string(),
            roles,
            email_verified: false,
            last_login_at: None,
        };
        self.users.insert(user.id, user.clone());
        user
    }

    fn open_session(&mut self, user_id: i64) -> String {
        let sid = Uuid::new_v4().simple().to_string();
        self.sessions.insert(sid.clone(), user_id);
        sid
    }

    fn session_user(&self, headers: &HeaderMap) -> Option<&User> {
        let sid = cookie(headers, SESSION_COOKIE)?;
        let id = self.sessions.get(&sid)?;
        self.users.get(id)
    }

    /// Server-issued tokens must match one handed out by the csrf endpoint;
    /// client-generated tokens only need to be present.
    fn csrf_ok(&self, headers: &HeaderMap) -> bool {
        let issued = header_str(headers, "x-csrf-token").is_some_and(|token| self.csrf_tokens.contains(token));
        let generated = header_str(headers, "csrf-token").is_some_and(|token| !token.is_empty());
        issued || generated
    }
}

pub type Db = Arc<RwLock<AuthState>>;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct PasswordReset {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RolesInput {
    pub roles: Vec<String>,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(AuthState::seeded()));
    Router::new()
        .route("/api/auth/csrf/{id}", get(issue_csrf))
        .route("/api/auth/me", get(me))
        .route("/api/login", post(login))
        .route("/api/token/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/register", post(register))
        .route("/reset-password", post(password_request))
        .route("/reset-password/reset", post(password_reset))
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user).patch(patch_user).delete(delete_user))
        .route("/api/users/{id}/roles", post(update_roles))
        .route("/api/status", get(status))
        .route("/api/broken", get(broken))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- session endpoints ---

async fn issue_csrf(State(db): State<Db>, Path(_id): Path<String>) -> Json<Value> {
    let token = Uuid::new_v4().simple().to_string();
    db.write().await.csrf_tokens.insert(token.clone());
    Json(json!({ "token": token }))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Response {
    let state = db.read().await;
    match state.session_user(&headers) {
        Some(user) => Json(json!({ "user": user })).into_response(),
        None => problem(StatusCode::UNAUTHORIZED, "Not authenticated."),
    }
}

async fn login(State(db): State<Db>, headers: HeaderMap, Json(input): Json<Credentials>) -> Response {
    let mut state = db.write().await;
    if !state.csrf_ok(&headers) {
        return problem(StatusCode::FORBIDDEN, "Invalid CSRF token.");
    }
    let Some(user) = state
        .users
        .values_mut()
        .find(|user| user.email == input.email && user.password == input.password)
    else {
        return problem(StatusCode::UNAUTHORIZED, "Invalid credentials.");
    };
    user.last_login_at = Some("2024-01-01T00:00:00+00:00".to_string());
    let user = user.clone();
    let sid = state.open_session(user.id);
    (
        [(header::SET_COOKIE, session_cookie(&sid))],
        Json(json!({ "user": user, "exp": SESSION_EXP })),
    )
        .into_response()
}

async fn refresh(State(db): State<Db>, headers: HeaderMap) -> Response {
    let mut state = db.write().await;
    let Some(user_id) = state.session_user(&headers).map(|user| user.id) else {
        return problem(StatusCode::UNAUTHORIZED, "Not authenticated.");
    };
    if let Some(old) = cookie(&headers, SESSION_COOKIE) {
        state.sessions.remove(&old);
    }
    let sid = state.open_session(user_id);
    ([(header::SET_COOKIE, session_cookie(&sid))], Json(json!({ "exp": SESSION_EXP }))).into_response()
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    let mut state = db.write().await;
    if !state.csrf_ok(&headers) {
        return problem(StatusCode::FORBIDDEN, "Invalid CSRF token.");
    }
    if let Some(sid) = cookie(&headers, SESSION_COOKIE) {
        state.sessions.remove(&sid);
    }
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"))],
    )
        .into_response()
}

async fn register(State(db): State<Db>, headers: HeaderMap, Json(input): Json<Value>) -> Response {
    let mut state = db.write().await;
    if !state.csrf_ok(&headers) {
        return problem(StatusCode::FORBIDDEN, "Invalid CSRF token.");
    }
    let (Some(email), Some(password)) = (
        input.get("email").and_then(Value::as_str),
        input.get("password").and_then(Value::as_str),
    ) else {
        return problem(StatusCode::UNPROCESSABLE_ENTITY, "email and password are required.");
    };
    if state.users.values().any(|user| user.email == email) {
        return problem(StatusCode::CONFLICT, "Email already registered.");
    }
    let user = state.insert_user(email, password, vec!["ROLE_USER".to_string()]);
    (StatusCode::CREATED, Json(json!({ "user": user }))).into_response()
}

async fn password_request(State(db): State<Db>, headers: HeaderMap, Json(input): Json<PasswordRequest>) -> Response {
    let mut state = db.write().await;
    if !state.csrf_ok(&headers) {
        return problem(StatusCode::FORBIDDEN, "Invalid CSRF token.");
    }
    // Unknown emails get the same answer so accounts cannot be enumerated.
    if let Some(id) = state.users.values().find(|user| user.email == input.email).map(|user| user.id) {
        state.reset_tokens.insert(reset_token(id), id);
    }
    Json(json!({ "status": "sent" })).into_response()
}

async fn password_reset(State(db): State<Db>, headers: HeaderMap, Json(input): Json<PasswordReset>) -> Response {
    let mut state = db.write().await;
    if !state.csrf_ok(&headers) {
        return problem(StatusCode::FORBIDDEN, "Invalid CSRF token.");
    }
    let Some(id) = state.reset_tokens.remove(&input.token) else {
        return problem(StatusCode::BAD_REQUEST, "Invalid reset token.");
    };
    if let Some(user) = state.users.get_mut(&id) {
        user.password = input.password;
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Token the mock "mails" to `user_id` after a password request.
pub fn reset_token(user_id: i64) -> String {
    format!("reset-{user_id}")
}

// --- users resource ---

async fn list_users(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    let state = db.read().await;
    let matching: Vec<&User> = state
        .users
        .values()
        .filter(|user| params.get("email").is_none_or(|email| &user.email == email))
        .collect();

    let page = params.get("page").and_then(|p| p.parse::<usize>().ok()).unwrap_or(1).max(1);
    let per_page = params.get("itemsPerPage").and_then(|p| p.parse::<usize>().ok());
    let members: Vec<Value> = match per_page {
        Some(size) => matching.iter().skip((page - 1) * size).take(size).map(|u| user_ld(u)).collect(),
        None => matching.iter().map(|u| user_ld(u)).collect(),
    };

    let mut body = json!({
        "@context": "/api/contexts/User",
        "@id": "/api/users",
        "@type": "Collection",
        "totalItems": matching.len(),
        "member": members,
    });
    if let Some(size) = per_page {
        body["view"] = json!({
            "@id": format!("/api/users?page={page}&itemsPerPage={size}"),
            "@type": "PartialCollectionView",
        });
    }
    Json(body).into_response()
}

async fn get_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    let state = db.read().await;
    match state.users.get(&id) {
        Some(user) => Json(user_ld(user)).into_response(),
        None => problem(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn patch_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(changes): Json<Value>,
) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    let mut state = db.write().await;
    let Some(user) = state.users.get_mut(&id) else {
        return problem(StatusCode::NOT_FOUND, "Not Found");
    };
    if let Some(email) = changes.get("email").and_then(Value::as_str) {
        user.email = email.to_string();
    }
    if let Some(verified) = changes.get("emailVerified").and_then(Value::as_bool) {
        user.email_verified = verified;
    }
    Json(user_ld(user)).into_response()
}

async fn delete_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    let mut state = db.write().await;
    match state.users.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => problem(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn update_roles(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<RolesInput>,
) -> Response {
    if let Err(denied) = require_admin(&headers) {
        return denied;
    }
    let mut state = db.write().await;
    if !state.csrf_ok(&headers) {
        return problem(StatusCode::FORBIDDEN, "Invalid CSRF token.");
    }
    let Some(user) = state.users.get_mut(&id) else {
        return problem(StatusCode::NOT_FOUND, "Not Found");
    };
    user.roles = input.roles;
    Json(json!({ "id": user.id, "roles": user.roles })).into_response()
}

// --- misc ---

async fn status() -> &'static str {
    "ok"
}

async fn broken() -> Response {
    (StatusCode::BAD_GATEWAY, "<html><body>Bad Gateway</body></html>").into_response()
}

fn user_ld(user: &User) -> Value {
    let mut value = json!({
        "@id": format!("/api/users/{}", user.id),
        "@type": "User",
    });
    if let (Some(target), Value::Object(fields)) = (value.as_object_mut(), json!(user)) {
        target.extend(fields);
    }
    value
}

fn problem(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn require_admin(headers: &HeaderMap) -> Result<(), Response> {
    match header_str(headers, "authorization") {
        Some(value) if value == format!("Bearer {ADMIN_TOKEN}") => Ok(()),
        _ => Err(problem(StatusCode::UNAUTHORIZED, "Full authentication is required.")),
    }
}

fn session_cookie(sid: &str) -> String {
    format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Lax")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, "cookie")?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn user_serializes_without_password() {
        let user = AuthState::seeded().users[&1].clone();
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], ADMIN_EMAIL);
        assert_eq!(json["emailVerified"], false);
        assert!(json.get("password").is_none());
    }

    #[test]
    fn user_ld_carries_envelope() {
        let user = AuthState::seeded().users[&1].clone();
        let value = user_ld(&user);
        assert_eq!(value["@id"], "/api/users/1");
        assert_eq!(value["@type"], "User");
        assert_eq!(value["roles"], json!(["ROLE_ADMIN"]));
    }

    #[test]
    fn cookie_parsing() {
        let map = headers(&[("cookie", "theme=dark; session=abc; other=1")]);
        assert_eq!(cookie(&map, SESSION_COOKIE).as_deref(), Some("abc"));
        assert_eq!(cookie(&map, "missing"), None);
    }

    #[test]
    fn csrf_accepts_issued_or_generated_tokens() {
        let mut state = AuthState::seeded();
        state.csrf_tokens.insert("issued".to_string());
        assert!(state.csrf_ok(&headers(&[("x-csrf-token", "issued")])));
        assert!(!state.csrf_ok(&headers(&[("x-csrf-token", "forged")])));
        assert!(state.csrf_ok(&headers(&[("csrf-token", "0123456789abcdef")])));
        assert!(!state.csrf_ok(&HeaderMap::new()));
    }

    #[test]
    fn admin_requires_bearer() {
        assert!(require_admin(&headers(&[("authorization", "Bearer admin-token")])).is_ok());
        assert!(require_admin(&headers(&[("authorization", "Bearer nope")])).is_err());
    }
}
