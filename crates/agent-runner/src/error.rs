//! Error types for agentchat-runner

use thiserror::Error;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors that can occur while building or running a team
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Error bubbled up from the core crate
    #[error(transparent)]
    Core(#[from] agentchat_core::Error),

    /// Model client could not be configured
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model call failed or returned something unusable
    #[error("Model error: {0}")]
    Model(String),

    /// Transport-level failure talking to the model endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A tool rejected its arguments or failed to run
    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    /// Team definition is inconsistent
    #[error("Invalid team: {0}")]
    InvalidTeam(String),

    /// Human input could not be obtained
    #[error("User input error: {0}")]
    Input(String),

    /// The consumer of the event stream went away
    #[error("Event channel closed")]
    ChannelClosed,
}

impl RunnerError {
    /// Create a Tool error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a Model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }
}
