//! HTTP routes
//!
//! - `POST /api/streams/key`          : issue a key for the caller
//! - `POST /api/streams/key/validate` : check a key against the caller
//! - `GET  /health`

use crate::auth::{StreamKey, StreamKeyAuthority};
use crate::server::identity::CurrentUser;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

const INVALID_FORMAT: &str = "Invalid stream key format";

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<StreamKeyAuthority>,
}

impl AppState {
    pub fn new(authority: StreamKeyAuthority) -> Self {
        Self {
            authority: Arc::new(authority),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub stream_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default)]
    pub stream_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/streams/key", post(issue_handler))
        .route("/api/streams/key/validate", post(validate_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn issue_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Json<IssueResponse> {
    let key = state.authority.issue(user_id);
    info!(subject_id = user_id, issued_at = key.issued_at(), "Issued stream key");

    Json(IssueResponse {
        stream_key: key.to_string(),
    })
}

async fn validate_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Response {
    // An unreadable body is reported exactly like a malformed key
    let stream_key = match payload {
        Ok(Json(req)) => req.stream_key,
        Err(e) => {
            debug!(subject_id = user_id, error = %e, "Rejected unreadable validate body");
            return invalid_format();
        }
    };

    if !StreamKey::has_valid_format(&stream_key) {
        debug!(subject_id = user_id, "Rejected malformed stream key");
        return invalid_format();
    }

    // Every other failure looks the same to the caller
    let is_valid = state.authority.verify(&stream_key, user_id);

    Json(ValidateResponse { is_valid, error: None }).into_response()
}

fn invalid_format() -> Response {
    let body = ValidateResponse {
        is_valid: false,
        error: Some(INVALID_FORMAT.to_string()),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Run the HTTP server
pub async fn run_http_server(bind_addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "HTTP server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
