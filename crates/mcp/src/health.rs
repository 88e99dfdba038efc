use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::tools::ALL_TOOL_NAMES;

#[derive(Clone, Debug)]
pub struct HealthState {
    pipedrive_base_url: String,
}

impl HealthState {
    pub fn new(pipedrive_base_url: impl Into<String>) -> Self {
        Self { pipedrive_base_url: pipedrive_base_url.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub pipedrive: HealthCheck,
    pub tools: Vec<&'static str>,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// The Pipedrive check reports configuration only; the API is not called.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "pdops-mcp runtime initialized".to_string(),
        },
        pipedrive: HealthCheck { status: "configured", detail: state.pipedrive_base_url },
        tools: ALL_TOOL_NAMES.to_vec(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
