use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_CLIENT_ID: &str = "demo-client";
pub const DEFAULT_CLIENT_SECRET: &str = "demo-secret";
pub const DEFAULT_API_KEY: &str = "demo-api-key";

/// Credentials and lifetimes the server accepts.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_key: String,
    pub expires_in: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: DEFAULT_CLIENT_SECRET.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            expires_in: 3600,
        }
    }
}

/// Body of a successful `POST /oauth/token`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub refresh_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub client_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub received_bytes: usize,
}

#[derive(Default)]
struct Grants {
    /// access token -> client id
    access: HashMap<String, String>,
    /// refresh token -> client id
    refresh: HashMap<String, String>,
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    grants: Arc<RwLock<Grants>>,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        grants: Arc::new(RwLock::new(Grants::default())),
    };
    Router::new()
        .route("/oauth/token", post(issue_token))
        .route("/me", get(me))
        .route("/custom", get(custom))
        .route("/public", get(public))
        .route("/upload", post(upload))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Value of the `Authorization` header after `scheme `, if present.
fn credentials<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (given, rest) = value.split_once(' ')?;
    given.eq_ignore_ascii_case(scheme).then_some(rest.trim())
}

async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, StatusCode> {
    let encoded = credentials(&headers, "Basic").ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let expected = format!("{}:{}", state.config.client_id, state.config.client_secret);
    if decoded != expected {
        debug!("rejected client credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let mut grants = state.grants.write().await;
    match input.grant_type.as_str() {
        "client_credentials" => {}
        "refresh_token" => {
            let presented = input.refresh_token.ok_or(StatusCode::BAD_REQUEST)?;
            grants
                .refresh
                .remove(&presented)
                .ok_or(StatusCode::UNAUTHORIZED)?;
        }
        _ => return Err(StatusCode::BAD_REQUEST),
    }

    let response = TokenResponse {
        access_token: Uuid::new_v4().to_string(),
        refresh_token: Uuid::new_v4().to_string(),
        token_type: "Bearer".to_string(),
        expires_in: state.config.expires_in,
    };
    let client_id = state.config.client_id.clone();
    grants
        .access
        .insert(response.access_token.clone(), client_id.clone());
    grants
        .refresh
        .insert(response.refresh_token.clone(), client_id);
    info!(grant_type = %input.grant_type, "issued token");
    Ok(Json(response))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Profile>, StatusCode> {
    let token = credentials(&headers, "Bearer").ok_or(StatusCode::UNAUTHORIZED)?;
    let grants = state.grants.read().await;
    grants
        .access
        .get(token)
        .map(|client_id| {
            Json(Profile {
                client_id: client_id.clone(),
            })
        })
        .ok_or(StatusCode::UNAUTHORIZED)
}

async fn custom(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if key != state.config.api_key {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn public() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn upload(body: String) -> Json<UploadReceipt> {
    Json(UploadReceipt {
        received_bytes: body.len(),
    })
}
