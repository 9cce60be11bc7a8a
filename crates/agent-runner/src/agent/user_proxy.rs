//! Agent standing in for the human

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use agentchat_core::message::{ChatEvent, TextMessage, UserInputRequestedEvent};

use super::{AgentComponent, ChatAgent, EventSink, UserInput};
use crate::error::Result;

const INPUT_PROMPT: &str = "Enter your response: ";

pub struct UserProxyAgent {
    name: String,
    description: String,
    input: Arc<dyn UserInput>,
}

impl UserProxyAgent {
    pub fn new(name: impl Into<String>, input: Arc<dyn UserInput>) -> Self {
        Self {
            name: name.into(),
            description: "A human user".to_string(),
            input,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl ChatAgent for UserProxyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn respond(&self, _thread: &[ChatEvent], sink: &mut EventSink) -> Result<ChatEvent> {
        let request_id = Uuid::new_v4().to_string();
        sink.emit(ChatEvent::UserInputRequestedEvent(UserInputRequestedEvent {
            source: self.name.clone(),
            models_usage: None,
            request_id: request_id.clone(),
            content: String::new(),
        }))
        .await?;

        debug!("{} waiting for input (request {})", self.name, request_id);
        let content = self.input.read(INPUT_PROMPT).await?;
        Ok(TextMessage::new(&self.name, content).into())
    }

    fn dump_config(&self) -> AgentComponent {
        AgentComponent {
            provider: "UserProxyAgent".to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            system_message: None,
            tools: Vec::new(),
            handoffs: Vec::new(),
            model_client: None,
            reflect_on_tool_use: false,
        }
    }
}
