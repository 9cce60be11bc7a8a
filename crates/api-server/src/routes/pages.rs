//! Chat page and static assets

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tracing::warn;

use crate::state::{AppState, INDEX_FILE};

async fn index(State(state): State<AppState>) -> Response {
    let path = state.static_dir().join(INDEX_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!("Cannot serve {:?}: {}", path, e);
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .nest_service("/static", ServeDir::new(state.static_dir()))
}
