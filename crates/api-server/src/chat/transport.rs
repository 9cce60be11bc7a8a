//! Text-frame transport under a chat session

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use tracing::debug;

use super::ChatError;

/// Bidirectional stream of JSON text frames
#[async_trait]
pub trait ChatTransport: Send {
    /// Next text frame, `None` once the peer has gone away
    async fn recv(&mut self) -> Result<Option<String>, ChatError>;

    async fn send(&mut self, frame: String) -> Result<(), ChatError>;
}

pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl ChatTransport for WsTransport {
    async fn recv(&mut self) -> Result<Option<String>, ChatError> {
        loop {
            match self.socket.recv().await {
                None => return Ok(None),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()))
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // Axum answers pings itself
                    debug!("Control frame from chat client");
                }
                Some(Err(e)) => return Err(ChatError::Transport(e.to_string())),
            }
        }
    }

    async fn send(&mut self, frame: String) -> Result<(), ChatError> {
        self.socket
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))
    }
}
