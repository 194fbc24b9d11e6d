use super::AppState;
use crate::{
    error::{AppError, Result},
    models::ApiResponse,
    services::chat_service::ChatOutcome,
};
use axum::{extract::State, Json};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// POST /api/v1/chat
///
/// Classification and response generation never fail; the only error
/// surface here is request validation.
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatOutcome>>> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let outcome = state.chat.classify_and_respond(message).await;
    Ok(Json(ApiResponse::success(outcome)))
}
