//! Chat history endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

async fn get_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, (StatusCode, Json<ErrorResponse>)> {
    state.history().load().await.map(Json).map_err(|e| {
        error!("Failed to read history {:?}: {}", state.history().path(), e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                detail: e.to_string(),
            }),
        )
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/history", get(get_history))
}
