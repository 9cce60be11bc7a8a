//! Chat message and event envelopes
//!
//! Every envelope serializes with a `type` discriminator so clients can tell
//! chat messages apart from agent events.

use serde::{Deserialize, Serialize};

/// Token usage reported by a model call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A tool invocation requested by a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them
    pub arguments: String,
}

/// Outcome of running one tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionExecutionResult {
    pub call_id: String,
    #[serde(default)]
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

/// Plain text chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub source: String,
    #[serde(default)]
    pub models_usage: Option<RequestUsage>,
    pub content: String,
}

impl TextMessage {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            models_usage: None,
            content: content.into(),
        }
    }

    pub fn with_usage(mut self, usage: Option<RequestUsage>) -> Self {
        self.models_usage = usage;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequestEvent {
    pub source: String,
    #[serde(default)]
    pub models_usage: Option<RequestUsage>,
    pub content: Vec<FunctionCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallExecutionEvent {
    pub source: String,
    #[serde(default)]
    pub models_usage: Option<RequestUsage>,
    pub content: Vec<FunctionExecutionResult>,
}

/// Tool results rendered as the agent's reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallSummaryMessage {
    pub source: String,
    #[serde(default)]
    pub models_usage: Option<RequestUsage>,
    pub content: String,
}

/// Transfers the turn to another participant or to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffMessage {
    pub source: String,
    #[serde(default)]
    pub models_usage: Option<RequestUsage>,
    pub target: String,
    pub content: String,
}

/// Asks the client for human input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInputRequestedEvent {
    pub source: String,
    #[serde(default)]
    pub models_usage: Option<RequestUsage>,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub content: String,
}

/// Envelope streamed from a team run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    TextMessage(TextMessage),
    ToolCallRequestEvent(ToolCallRequestEvent),
    ToolCallExecutionEvent(ToolCallExecutionEvent),
    ToolCallSummaryMessage(ToolCallSummaryMessage),
    HandoffMessage(HandoffMessage),
    UserInputRequestedEvent(UserInputRequestedEvent),
}

impl ChatEvent {
    pub fn source(&self) -> &str {
        match self {
            Self::TextMessage(m) => &m.source,
            Self::ToolCallRequestEvent(e) => &e.source,
            Self::ToolCallExecutionEvent(e) => &e.source,
            Self::ToolCallSummaryMessage(m) => &m.source,
            Self::HandoffMessage(m) => &m.source,
            Self::UserInputRequestedEvent(e) => &e.source,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TextMessage(_) => "TextMessage",
            Self::ToolCallRequestEvent(_) => "ToolCallRequestEvent",
            Self::ToolCallExecutionEvent(_) => "ToolCallExecutionEvent",
            Self::ToolCallSummaryMessage(_) => "ToolCallSummaryMessage",
            Self::HandoffMessage(_) => "HandoffMessage",
            Self::UserInputRequestedEvent(_) => "UserInputRequestedEvent",
        }
    }

    /// Chat messages are what participants say; the rest are agent events.
    pub fn is_chat_message(&self) -> bool {
        matches!(
            self,
            Self::TextMessage(_) | Self::ToolCallSummaryMessage(_) | Self::HandoffMessage(_)
        )
    }

    pub fn is_input_request(&self) -> bool {
        matches!(self, Self::UserInputRequestedEvent(_))
    }

    /// Text rendering used for termination checks and selector history.
    pub fn to_text(&self) -> String {
        match self {
            Self::TextMessage(m) => m.content.clone(),
            Self::ToolCallSummaryMessage(m) => m.content.clone(),
            Self::HandoffMessage(m) => m.content.clone(),
            Self::UserInputRequestedEvent(e) => e.content.clone(),
            Self::ToolCallRequestEvent(e) => e
                .content
                .iter()
                .map(|c| format!("{}({})", c.name, c.arguments))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::ToolCallExecutionEvent(e) => e
                .content
                .iter()
                .map(|r| r.content.clone())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<TextMessage> for ChatEvent {
    fn from(message: TextMessage) -> Self {
        Self::TextMessage(message)
    }
}

impl From<HandoffMessage> for ChatEvent {
    fn from(message: HandoffMessage) -> Self {
        Self::HandoffMessage(message)
    }
}

/// Aggregate produced once a team run stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub messages: Vec<ChatEvent>,
    pub stop_reason: Option<String>,
}
