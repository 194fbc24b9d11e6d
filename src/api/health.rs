use super::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ai: String,
    pub environment: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.supervisor.get_status().await;
    let ai = if status.connected {
        "connected".to_string()
    } else if status.fallback_active {
        "fallback".to_string()
    } else {
        "starting".to_string()
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ai,
        environment: state.config.environment.clone(),
        timestamp: chrono::Utc::now(),
    })
}
