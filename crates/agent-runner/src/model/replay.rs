//! Scripted model client
//!
//! Returns pre-recorded completions in order. Useful for demos without an
//! API key and for exercising teams end to end.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use agentchat_core::config::ModelConfig;
use agentchat_core::message::FunctionCall;

use super::{ChatCompletionClient, CreateResult, LlmMessage, ToolSchema};
use crate::error::{Result, RunnerError};

/// One scripted completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayResponse {
    Text(String),
    ToolCalls { tool_calls: Vec<ReplayToolCall> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ReplayConfig {
    #[serde(default)]
    chat_completions: Vec<ReplayResponse>,
}

pub struct ReplayChatCompletionClient {
    responses: Vec<ReplayResponse>,
    cursor: AtomicUsize,
}

impl ReplayChatCompletionClient {
    pub fn new(responses: Vec<ReplayResponse>) -> Self {
        Self {
            responses,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Script made only of text replies
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| ReplayResponse::Text(t.into())).collect())
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let parsed: ReplayConfig = serde_json::from_value(config.config.clone())
            .map_err(|e| RunnerError::Config(format!("Invalid replay client config: {}", e)))?;
        Ok(Self::new(parsed.chat_completions))
    }

    /// Number of scripted completions not yet returned
    pub fn remaining(&self) -> usize {
        self.responses
            .len()
            .saturating_sub(self.cursor.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl ChatCompletionClient for ReplayChatCompletionClient {
    async fn create(&self, messages: &[LlmMessage], _tools: &[ToolSchema]) -> Result<CreateResult> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .get(index)
            .ok_or_else(|| RunnerError::model("No more mock responses available"))?;
        debug!(
            "Replaying completion {} over {} messages",
            index,
            messages.len()
        );

        let result = match response {
            ReplayResponse::Text(text) => CreateResult::text(text.clone()),
            ReplayResponse::ToolCalls { tool_calls } => CreateResult::tool_calls(
                tool_calls
                    .iter()
                    .enumerate()
                    .map(|(i, call)| FunctionCall {
                        id: call
                            .id
                            .clone()
                            .unwrap_or_else(|| format!("call_{}_{}", index, i)),
                        name: call.name.clone(),
                        arguments: match &call.arguments {
                            Value::String(raw) => raw.clone(),
                            Value::Null => "{}".to_string(),
                            other => other.to_string(),
                        },
                    })
                    .collect(),
            ),
        };
        Ok(result)
    }

    fn dump_config(&self) -> ModelConfig {
        ModelConfig::new(
            "replay",
            json!({ "chat_completions": self.responses }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Completion;

    #[tokio::test]
    async fn test_replays_in_order_then_errors() {
        let client = ReplayChatCompletionClient::from_texts(["first", "second"]);
        assert_eq!(client.remaining(), 2);

        let a = client.create(&[], &[]).await.unwrap();
        let b = client.create(&[], &[]).await.unwrap();
        assert_eq!(a.content, Completion::Text("first".into()));
        assert_eq!(b.content, Completion::Text("second".into()));
        assert_eq!(client.remaining(), 0);

        assert!(matches!(
            client.create(&[], &[]).await,
            Err(RunnerError::Model(_))
        ));
    }

    #[tokio::test]
    async fn test_tool_calls_from_config() {
        let config = ModelConfig::new(
            "replay",
            json!({
                "chat_completions": [
                    { "tool_calls": [{ "name": "search_web_tool", "arguments": { "query": "2006-2007" } }] }
                ]
            }),
        );
        let client = ReplayChatCompletionClient::from_config(&config).unwrap();
        let result = client.create(&[], &[]).await.unwrap();
        match result.content {
            Completion::ToolCalls(calls) => {
                assert_eq!(calls[0].id, "call_0_0");
                assert_eq!(calls[0].name, "search_web_tool");
                let args: Value = serde_json::from_str(&calls[0].arguments).unwrap();
                assert_eq!(args["query"], "2006-2007");
            }
            other => panic!("Expected tool calls, got: {:?}", other),
        }
    }
}
