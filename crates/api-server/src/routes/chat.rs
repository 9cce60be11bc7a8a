//! WebSocket chat route

use axum::{routing::get, Router};

use crate::chat::chat_ws_handler;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/chat", get(chat_ws_handler))
}
