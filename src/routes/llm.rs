use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use crate::llm::ask_about_file;
use crate::models::{AppState, GenerateRequest, GenerateResponse};
use crate::types::AppResult;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/llm/generate", post(generate))
        .with_state(state)
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    info!("Question about file {}", request.file_id);
    Ok(Json(ask_about_file(&state, &request.file_id, &request.question).await?))
}
