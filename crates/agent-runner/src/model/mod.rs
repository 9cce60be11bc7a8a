//! Model clients
//!
//! A [`ChatCompletionClient`] turns a conversation into either a text reply
//! or a set of tool calls. Clients are built from a [`ModelConfig`].

mod openai;
mod replay;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use agentchat_core::config::{ModelConfig, ModelProvider};
use agentchat_core::message::{FunctionCall, FunctionExecutionResult, RequestUsage};

use crate::error::Result;

pub use openai::{OpenAiChatCompletionClient, OpenAiClientConfig};
pub use replay::{ReplayChatCompletionClient, ReplayResponse, ReplayToolCall};

/// What the model produced
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Text(String),
    ToolCalls(Vec<FunctionCall>),
}

/// Result of a single model call
#[derive(Debug, Clone, PartialEq)]
pub struct CreateResult {
    pub content: Completion,
    pub finish_reason: String,
    pub usage: RequestUsage,
}

impl CreateResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Completion::Text(content.into()),
            finish_reason: "stop".to_string(),
            usage: RequestUsage::default(),
        }
    }

    pub fn tool_calls(calls: Vec<FunctionCall>) -> Self {
        Self {
            content: Completion::ToolCalls(calls),
            finish_reason: "function_calls".to_string(),
            usage: RequestUsage::default(),
        }
    }
}

/// A message in the model's context window
#[derive(Debug, Clone, PartialEq)]
pub enum LlmMessage {
    System(String),
    User { content: String, source: String },
    Assistant { content: Completion, source: String },
    ToolResults(Vec<FunctionExecutionResult>),
}

/// Function description advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    /// Run one completion over `messages`, offering `tools`
    async fn create(&self, messages: &[LlmMessage], tools: &[ToolSchema]) -> Result<CreateResult>;

    /// Configuration that rebuilds an equivalent client, secrets masked
    fn dump_config(&self) -> ModelConfig;
}

/// Build a client from a parsed config
pub fn create_model_client(config: &ModelConfig) -> Result<Arc<dyn ChatCompletionClient>> {
    let client: Arc<dyn ChatCompletionClient> = match config.provider()? {
        ModelProvider::OpenAi => Arc::new(OpenAiChatCompletionClient::from_config(config)?),
        ModelProvider::Replay => Arc::new(ReplayChatCompletionClient::from_config(config)?),
    };
    Ok(client)
}

/// Read `model_config.yaml` and build the client it describes
pub async fn load_model_client(path: impl AsRef<Path>) -> Result<Arc<dyn ChatCompletionClient>> {
    let config = ModelConfig::load(path).await?;
    info!("Using model provider: {}", config.provider);
    create_model_client(&config)
}
