//! HTTP control plane.
//!
//! | Method | Path | Body | Response |
//! |---|---|---|---|
//! | POST | `/api/open` | `{"password": "..."}` | `{"status", "message"}` |
//! | POST | `/api/lock` | none | `{"status", "message"}` |
//! | GET | `/api/status` | none | gateway counters |
//!
//! Device outcomes, including device-reported errors, are `200`. Only
//! requests that never produced a device outcome use other status codes.

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use safebridge_core::constants::{MSG_DEVICE_BUSY, MSG_PASSWORD_REQUIRED};
use safebridge_core::{CommandOutcome, OutcomeStatus, Password};
use safebridge_gateway::{GatewayError, GatewayHandle, StatsSnapshot};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, warn};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    gateway: GatewayHandle,
}

impl AppState {
    pub fn new(gateway: GatewayHandle) -> Self {
        Self { gateway }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/open", post(open))
        .route("/api/lock", post(lock))
        .route("/api/status", get(status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: OutcomeStatus,
    pub message: String,
}

type Reply = (StatusCode, Json<ApiResponse>);

fn reply(code: StatusCode, status: OutcomeStatus, message: impl Into<String>) -> Reply {
    (
        code,
        Json(ApiResponse {
            status,
            message: message.into(),
        }),
    )
}

/// `POST /api/open`
///
/// A missing or unparsable body is treated like a missing password.
pub async fn open(
    State(state): State<AppState>,
    body: Result<Json<OpenRequest>, JsonRejection>,
) -> Reply {
    let password = body
        .ok()
        .and_then(|Json(request)| request.password)
        .unwrap_or_default();

    if password.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            OutcomeStatus::Error,
            MSG_PASSWORD_REQUIRED,
        );
    }

    let password = match Password::new(&password) {
        Ok(password) => password,
        Err(e) if e.is_validation() => {
            debug!(error = %e, "Rejected open request");
            return reply(StatusCode::BAD_REQUEST, OutcomeStatus::Error, e.to_string());
        }
        Err(e) => {
            error!(error = %e, "Unexpected password error");
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                OutcomeStatus::Error,
                e.to_string(),
            );
        }
    };

    respond(state.gateway.open(password).await)
}

/// `POST /api/lock`
pub async fn lock(State(state): State<AppState>) -> Reply {
    respond(state.gateway.lock().await)
}

/// `GET /api/status`
pub async fn status(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.gateway.stats())
}

fn respond(result: Result<CommandOutcome, GatewayError>) -> Reply {
    match result {
        Ok(outcome) => reply(StatusCode::OK, outcome.status, outcome.message),
        Err(GatewayError::Busy { .. }) => reply(
            StatusCode::SERVICE_UNAVAILABLE,
            OutcomeStatus::Error,
            MSG_DEVICE_BUSY,
        ),
        Err(e @ GatewayError::WriteFailure { .. }) => {
            warn!(error = %e, "Command not delivered");
            reply(StatusCode::BAD_GATEWAY, OutcomeStatus::Error, e.to_string())
        }
        Err(e @ (GatewayError::DeviceUnavailable { .. } | GatewayError::Shutdown)) => {
            warn!(error = %e, "Command not delivered");
            reply(
                StatusCode::SERVICE_UNAVAILABLE,
                OutcomeStatus::Error,
                e.to_string(),
            )
        }
    }
}
