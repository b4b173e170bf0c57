use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use tfia_actions::{ActionCall, ActionRegistry};
use tfia_core::current_unix_timestamp_ms;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod server_bootstrap;
mod types;
mod upload_runtime;

pub use server_bootstrap::run_action_server;
use server_bootstrap::build_action_server_router;
use types::{ActionListEntry, ActionServerApiError, HealthResponse};

const WEBHOOK_ENDPOINT: &str = "/webhook";
const ACTIONS_ENDPOINT: &str = "/actions";
const HEALTH_ENDPOINT: &str = "/health";
const UPLOAD_TEST_FILE_ENDPOINT: &str = "/upload_test_file";

const CORS_ALLOW_ORIGIN: &str = "*";
const CORS_ALLOW_HEADERS: &str = "Content-Type,Authorization";
const CORS_ALLOW_METHODS: &str = "GET,PUT,POST,DELETE";

pub const DEFAULT_ACTION_SERVER_BIND: &str = "127.0.0.1:5055";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
/// Trackers carry the stored analysis of an upload, so this must stay well
/// above the upload limit.
pub const DEFAULT_MAX_WEBHOOK_BYTES: usize = 128 * 1024 * 1024;

#[derive(Clone)]
pub struct ActionServerConfig {
    pub bind: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub max_webhook_bytes: usize,
    pub registry: Arc<ActionRegistry>,
}

#[derive(Clone)]
struct ActionServerState {
    config: ActionServerConfig,
    upload_sequence: Arc<AtomicU64>,
}

impl ActionServerState {
    fn new(config: ActionServerConfig) -> Self {
        Self {
            config,
            upload_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Unique prefix for stored uploads within this process.
    fn next_upload_id(&self) -> String {
        let sequence = self.upload_sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}-{sequence}", current_unix_timestamp_ms())
    }
}

async fn handle_webhook(
    State(state): State<Arc<ActionServerState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(status = %rejection.status(), "webhook body rejected");
            return body_rejection_response(rejection);
        }
    };
    let call = match parse_json_body::<ActionCall>(&body) {
        Ok(call) => call,
        Err(error) => return error.into_response(),
    };
    match state.config.registry.dispatch(&call).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => {
            warn!(action = %error.action_name, "webhook called unknown action");
            (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": error.to_string(),
                    "action_name": error.action_name,
                })),
            )
                .into_response()
        }
    }
}

async fn handle_actions_list(State(state): State<Arc<ActionServerState>>) -> Response {
    let actions = state
        .config
        .registry
        .registered_action_names()
        .into_iter()
        .map(|name| ActionListEntry { name })
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(actions)).into_response()
}

async fn handle_health() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

async fn handle_cors_preflight() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn apply_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    response
}

fn body_rejection_response(rejection: BytesRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ActionServerApiError::payload_too_large(rejection.body_text()).into_response()
    } else {
        ActionServerApiError::bad_request("unreadable_body", rejection.body_text()).into_response()
    }
}

fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ActionServerApiError> {
    serde_json::from_slice::<T>(body).map_err(|error| {
        ActionServerApiError::bad_request(
            "malformed_json",
            format!("failed to parse request body: {error}"),
        )
    })
}
