use super::AppState;
use crate::{models::ApiResponse, services::supervisor::ConnectionStatus};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct RestartResponse {
    pub restarted: bool,
    pub status: ConnectionStatus,
}

/// GET /api/v1/ai/status
pub async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<ConnectionStatus>> {
    Json(ApiResponse::success(state.supervisor.get_status().await))
}

/// POST /api/v1/ai/restart
///
/// A failed restart is still a 200: the outcome is carried in the body,
/// and the process keeps serving from fallback.
pub async fn restart(State(state): State<AppState>) -> Json<ApiResponse<RestartResponse>> {
    let restarted = state.supervisor.restart().await;
    let status = state.supervisor.get_status().await;
    Json(ApiResponse::success(RestartResponse { restarted, status }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ForceFallbackRequest {
    pub reason: Option<String>,
}

/// POST /api/v1/ai/force-fallback
pub async fn force_fallback(
    State(state): State<AppState>,
    payload: Option<Json<ForceFallbackRequest>>,
) -> Json<ApiResponse<ConnectionStatus>> {
    let reason = payload
        .and_then(|Json(p)| p.reason)
        .unwrap_or_else(|| "Fallback forced via API".to_string());
    state.supervisor.enable_fallback_mode(&reason).await;
    Json(ApiResponse::success(state.supervisor.get_status().await))
}
