#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use osem_admin::config::SessionConfig;
use osem_admin::session::SessionStore;
use osem_admin::{AppConfig, AppState};

pub const UPSTREAM_SECRET: &str = "upstream-signing-secret";
pub const ADMIN_LOGIN: &str = "admin@example.org";
pub const USER_LOGIN: &str = "someone@example.org";
/// Upstream answers this login with 200 but no token.
pub const TOKENLESS_LOGIN: &str = "tokenless@example.org";
pub const SESSION_SECRET: &str = "session-test-secret";
/// Records whose updates upstream answers with a non-Ok code.
pub const REFUSING_USER: &str = "u3";
/// Records whose updates and deletes fail upstream with 500.
pub const BROKEN_DEVICE: &str = "b2";
pub const PASSWORD: &str = "correct horse";

/// Requests the fake openSenseMap API has seen.
#[derive(Debug, Default)]
pub struct Recorded {
    pub sign_in_calls: usize,
    /// Last JSON body per "METHOD path".
    pub bodies: HashMap<String, Value>,
    pub last_authorization: Option<String>,
}

pub type Recorder = Arc<Mutex<Recorded>>;

pub struct TestApp {
    pub base_url: String,
    pub upstream_url: String,
    pub recorded: Recorder,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn sign_in_calls(&self) -> usize {
        self.recorded.lock().map(|r| r.sign_in_calls).unwrap_or_default()
    }

    pub fn body(&self, key: &str) -> Option<Value> {
        self.recorded.lock().ok().and_then(|r| r.bodies.get(key).cloned())
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.recorded.lock().ok().and_then(|r| r.last_authorization.clone())
    }

    /// Log in through the form and return the `name=value` pair of the session cookie.
    pub async fn login_as(&self, username: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/login"))
            .form(&[
                ("loginType", "login"),
                ("username", username),
                ("password", PASSWORD),
            ])
            .send()
            .await?;
        anyhow::ensure!(
            res.status() == StatusCode::SEE_OTHER,
            "login failed with {}",
            res.status()
        );
        session_cookie(&res).context("login set no session cookie")
    }
}

/// Start a fake upstream plus the admin app, each on its own port.
pub async fn spawn_app() -> Result<TestApp> {
    let recorded: Recorder = Arc::default();
    let upstream_url = spawn_upstream(recorded.clone()).await?;

    let config = AppConfig::from_lookup(|key| match key {
        "OSEM_API_URL" => Some(upstream_url.clone()),
        "MAPTILER_KEY" => Some("maptiler-test-key".to_string()),
        "SESSION_SECRET" => Some(SESSION_SECRET.to_string()),
        "OSEM_JWT_SECRET" => Some(UPSTREAM_SECRET.to_string()),
        _ => None,
    })?;
    let state = AppState::new(config)?;

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, osem_admin::app(state)).await;
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    Ok(TestApp {
        base_url: format!("http://127.0.0.1:{}", port),
        upstream_url,
        recorded,
        client,
    })
}

/// The `name=value` part of the `osem-admin-jwt` Set-Cookie header, if any.
pub fn session_cookie(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("osem-admin-jwt="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// `name=value` cookie pair for a session holding `token`, as the app would set it.
pub fn session_cookie_for(token: &str) -> Result<String> {
    let store = SessionStore::new(&SessionConfig {
        cookie_name: "osem-admin-jwt".to_string(),
        secret: SESSION_SECRET.to_string(),
        max_age_days: 30,
        secure: false,
    });
    let set_cookie = store.create(token)?;
    set_cookie
        .to_str()?
        .split(';')
        .next()
        .map(str::to_string)
        .context("empty Set-Cookie value")
}

pub fn location(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn issue_token(role: &str) -> String {
    issue_token_expiring(role, chrono::Utc::now().timestamp() + 3600)
}

pub fn issue_token_expiring(role: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({ "role": role, "sub": format!("{}-id", role), "exp": exp }),
        &EncodingKey::from_secret(UPSTREAM_SECRET.as_bytes()),
    )
    .expect("token encoding")
}

pub fn user_json() -> Value {
    json!({
        "_id": "u1",
        "name": "Jane Operator",
        "email": "jane@example.org",
        "role": "user",
        "language": "de_DE",
        "emailIsConfirmed": true,
        "boxes": ["b1"],
        "createdAt": "2023-04-01T10:00:00.000Z",
        "updatedAt": "2024-01-15T08:30:00.000Z"
    })
}

pub fn other_user_json() -> Value {
    json!({
        "_id": "u2",
        "name": "Max Mustermann",
        "email": "max@example.org",
        "role": "user",
        "boxes": []
    })
}

pub fn refusing_user_json() -> Value {
    json!({
        "_id": REFUSING_USER,
        "name": "Locked Account",
        "email": "locked@example.org",
        "role": "user",
        "boxes": []
    })
}

pub fn broken_device_json() -> Value {
    let mut device = device_json();
    device["_id"] = json!(BROKEN_DEVICE);
    device["name"] = json!("Flaky station");
    device
}

pub fn device_json() -> Value {
    json!({
        "_id": "b1",
        "name": "Garden station",
        "exposure": "outdoor",
        "model": "homeV2Wifi",
        "grouptag": ["school", "muenster"],
        "owner": { "_id": "u1", "name": "Jane Operator", "email": "jane@example.org" },
        "currentLocation": { "type": "Point", "coordinates": [7.62, 51.96], "timestamp": "2024-01-15T08:30:00.000Z" },
        "sensors": [],
        "createdAt": "2023-04-01T10:00:00.000Z",
        "updatedAt": "2024-01-15T08:30:00.000Z"
    })
}

async fn spawn_upstream(recorded: Recorder) -> Result<String> {
    let app = Router::new()
        .route("/users/sign-in", post(sign_in))
        .route("/management/users", get(|| async { Json(json!({ "users": [user_json(), other_user_json()] })) }))
        .route("/management/users/delete", post(record_ok))
        .route("/management/users/:id", get(get_user).put(update_record))
        .route("/management/users/:id/exec", post(record_ok))
        .route("/management/boxes", get(|| async { Json(json!({ "boxes": [device_json()] })) }))
        .route("/management/boxes/delete", post(delete_records))
        .route("/management/boxes/:id", get(get_device).put(update_record))
        .with_state(recorded);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

async fn sign_in(State(recorded): State<Recorder>, Json(body): Json<Value>) -> Response {
    if let Ok(mut r) = recorded.lock() {
        r.sign_in_calls += 1;
    }

    let login = body["email"].as_str().unwrap_or_default();
    if login == TOKENLESS_LOGIN {
        return Json(json!({ "code": "Authorized" })).into_response();
    }

    let role = match login {
        ADMIN_LOGIN => "admin",
        USER_LOGIN => "user",
        _ => "",
    };
    if role.is_empty() || body["password"] != PASSWORD {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "code": "Forbidden", "message": "User and or password not valid!" })),
        )
            .into_response();
    }

    Json(json!({ "code": "Authorized", "token": issue_token(role) })).into_response()
}

async fn get_user(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "u1" => Json(user_json()).into_response(),
        "u2" => Json(other_user_json()).into_response(),
        REFUSING_USER => Json(refusing_user_json()).into_response(),
        _ => not_found(),
    }
}

async fn get_device(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "b1" => Json(device_json()).into_response(),
        BROKEN_DEVICE => Json(broken_device_json()).into_response(),
        _ => not_found(),
    }
}

async fn record_ok(
    State(recorded): State<Recorder>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    if let Ok(mut r) = recorded.lock() {
        r.bodies.insert(format!("{} {}", method, uri.path()), body);
        r.last_authorization = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }
    Json(json!({ "code": "Ok", "data": {} }))
}

/// PUT on a record: refused for `REFUSING_USER`, a 500 for `BROKEN_DEVICE`.
async fn update_record(
    State(recorded): State<Recorder>,
    Path(id): Path<String>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    match id.as_str() {
        REFUSING_USER => Json(json!({ "code": "BadRequest", "message": "account is locked" })).into_response(),
        BROKEN_DEVICE => server_error(),
        _ => record_ok(State(recorded), method, uri, headers, Json(body))
            .await
            .into_response(),
    }
}

/// Batch delete that fails as a whole when it includes `BROKEN_DEVICE`.
async fn delete_records(
    State(recorded): State<Recorder>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let ids = body["boxIds"].as_array().cloned().unwrap_or_default();
    if ids.iter().any(|id| id.as_str() == Some(BROKEN_DEVICE)) {
        return server_error();
    }
    record_ok(State(recorded), method, uri, headers, Json(body))
        .await
        .into_response()
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "code": "InternalServerError", "message": "database exploded" })),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "code": "NotFound", "message": "not found" })),
    )
        .into_response()
}
