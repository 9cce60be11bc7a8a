//! Agents
//!
//! An agent reads the shared conversation and produces one response per
//! turn. Intermediate events (tool calls, input requests) go through an
//! [`EventSink`] as they happen.

mod assistant;
mod input;
mod user_proxy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use agentchat_core::config::ModelConfig;
use agentchat_core::message::ChatEvent;

use crate::error::{Result, RunnerError};
use crate::model::ToolSchema;
use crate::team::TeamEvent;

pub use assistant::{AssistantAgent, DEFAULT_DESCRIPTION, DEFAULT_SYSTEM_MESSAGE};
pub use input::{ChannelInput, UserInput};
pub use user_proxy::UserProxyAgent;

#[async_trait]
pub trait ChatAgent: Send + Sync {
    /// Unique name within a team
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Participants this agent may hand the turn to
    fn handoff_targets(&self) -> Vec<String> {
        Vec::new()
    }

    /// Take one turn over `thread`, returning the agent's chat message
    async fn respond(&self, thread: &[ChatEvent], sink: &mut EventSink) -> Result<ChatEvent>;

    fn dump_config(&self) -> AgentComponent;
}

/// Serializable description of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentComponent {
    pub provider: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handoffs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_client: Option<ModelConfig>,
    #[serde(default)]
    pub reflect_on_tool_use: bool,
}

/// Forwards events to the team's stream and remembers what was sent
pub struct EventSink {
    tx: Option<mpsc::Sender<Result<TeamEvent>>>,
    emitted: Vec<ChatEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<Result<TeamEvent>>) -> Self {
        Self {
            tx: Some(tx),
            emitted: Vec::new(),
        }
    }

    /// A sink that only records, for driving agents outside a team
    pub fn detached() -> Self {
        Self {
            tx: None,
            emitted: Vec::new(),
        }
    }

    pub async fn emit(&mut self, event: ChatEvent) -> Result<()> {
        self.emitted.push(event.clone());
        self.send(TeamEvent::Message(event)).await
    }

    pub(crate) async fn send(&self, event: TeamEvent) -> Result<()> {
        if let Some(tx) = &self.tx {
            tx.send(Ok(event))
                .await
                .map_err(|_| RunnerError::ChannelClosed)?;
        }
        Ok(())
    }

    /// Drain the events recorded since the last call
    pub fn take(&mut self) -> Vec<ChatEvent> {
        std::mem::take(&mut self.emitted)
    }
}
