//! WebSocket chat
//!
//! Each connection drives one team run per incoming message and streams
//! the run's events back as JSON text frames.

mod envelope;
mod session;
mod transport;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
};
use thiserror::Error;
use tracing::info;

use agentchat_runner::RunnerError;

use crate::state::AppState;

use session::ChatSession;
use transport::WsTransport;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Runner(#[from] RunnerError),

    #[error("{0}")]
    Store(#[from] agentchat_core::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a TextMessage, got type {0}")]
    UnexpectedType(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Client disconnected")]
    Disconnected,
}

/// WebSocket upgrade handler for `/ws/chat`
pub async fn chat_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        info!("Chat connection opened");
        let mut session = ChatSession::new(WsTransport::new(socket), state);
        session.run().await;
        info!("Chat connection closed");
    })
}
