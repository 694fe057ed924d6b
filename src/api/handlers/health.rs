use crate::AppState;
use crate::services::dispatcher::ScanStatsSnapshot;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub scanner: String,
    pub notifications: bool,
    pub capacity: usize,
    pub scans: ScanStatsSnapshot,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let scanner_status = if state.scanner.health_check().await {
        "reachable"
    } else {
        "unreachable"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        scanner: scanner_status.to_string(),
        notifications: state.config.webhook_url.is_some(),
        capacity: state.dispatcher.capacity(),
        scans: state.dispatcher.stats(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
