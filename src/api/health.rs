use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;

/// Readiness details
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    program: String,
    working_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// GET /healthz - Liveness check
pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /health/ready - Readiness check
///
/// Ready when the simulation working directory exists. The simulator itself
/// is not started.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let sim = state.runner.config();
    let error = match tokio::fs::metadata(sim.working_dir()).await {
        Ok(meta) if meta.is_dir() => None,
        Ok(_) => Some("working directory is not a directory".to_string()),
        Err(e) => Some(e.to_string()),
    };

    let status_code = if error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let response = ReadinessResponse {
        status: if error.is_none() { "ready" } else { "unavailable" },
        program: sim.program.clone(),
        working_dir: sim.working_dir().display().to_string(),
        error,
    };

    (status_code, Json(response))
}
