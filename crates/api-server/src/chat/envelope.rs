//! Frames the server writes that are not team events

use serde::Serialize;

use agentchat_core::message::SYSTEM_SOURCE;

pub const RETRY_PROMPT: &str = "An error occurred. Please try again.";

/// `{"type", "content", "source"}` frame sent on failures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub source: String,
}

impl ServerEnvelope {
    fn system(kind: &str, content: String) -> Self {
        Self {
            kind: kind.to_string(),
            content,
            source: SYSTEM_SOURCE.to_string(),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::system("error", format!("Error: {}", message))
    }

    pub fn unexpected(message: impl std::fmt::Display) -> Self {
        Self::system("error", format!("Unexpected error: {}", message))
    }

    /// Prompt sent after an error so the client re-enables input
    pub fn retry_prompt() -> Self {
        Self::system("UserInputRequestedEvent", RETRY_PROMPT.to_string())
    }
}
