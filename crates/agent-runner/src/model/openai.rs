//! OpenAI-compatible chat completions client
//!
//! Works against OpenAI and any service exposing the same API (Ollama,
//! vLLM, LiteLLM, ...).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use agentchat_core::config::ModelConfig;
use agentchat_core::message::{FunctionCall, RequestUsage};

use super::{ChatCompletionClient, Completion, CreateResult, LlmMessage, ToolSchema};
use crate::error::{Result, RunnerError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MASKED_SECRET: &str = "**********";

/// Settings understood under `config:` in `model_config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiClientConfig {
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
}

pub struct OpenAiChatCompletionClient {
    client: Client,
    config: OpenAiClientConfig,
    api_key: Option<String>,
    endpoint: String,
    source: ModelConfig,
}

impl OpenAiChatCompletionClient {
    pub fn from_config(source: &ModelConfig) -> Result<Self> {
        let config: OpenAiClientConfig = serde_json::from_value(source.config.clone())
            .map_err(|e| RunnerError::Config(format!("Invalid OpenAI client config: {}", e)))?;

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout {
            let timeout = Duration::try_from_secs_f64(secs).map_err(|e| {
                RunnerError::Config(format!("Invalid timeout {}: {}", secs, e))
            })?;
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RunnerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!("OpenAI client for model {} at {}", config.model, endpoint);

        Ok(Self {
            client,
            config,
            api_key,
            endpoint,
            source: source.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ChatCompletionClient for OpenAiChatCompletionClient {
    async fn create(&self, messages: &[LlmMessage], tools: &[ToolSchema]) -> Result<CreateResult> {
        let body = build_request_body(&self.config, messages, tools);
        debug!("request: {}", body);

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(org) = &self.config.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let res = request.send().await?;
        let status = res.status();
        let text = res.text().await?;
        debug!("response ({}): {}", status, text);

        if !status.is_success() {
            return Err(RunnerError::model(format!(
                "Model endpoint returned {}: {}",
                status, text
            )));
        }

        parse_response(&text)
    }

    fn dump_config(&self) -> ModelConfig {
        let mut dumped = self.source.clone();
        if let Some(obj) = dumped.config.as_object_mut() {
            if obj.contains_key("api_key") {
                obj.insert("api_key".into(), Value::String(MASKED_SECRET.into()));
            }
        }
        dumped
    }
}

/// OpenAI only accepts `[a-zA-Z0-9_-]` in the `name` field.
fn sanitize_name(source: &str) -> String {
    source
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn wire_messages(messages: &[LlmMessage]) -> Vec<Value> {
    let mut wire = Vec::with_capacity(messages.len());
    for message in messages {
        match message {
            LlmMessage::System(content) => {
                wire.push(json!({ "role": "system", "content": content }));
            }
            LlmMessage::User { content, source } => {
                wire.push(json!({
                    "role": "user",
                    "content": content,
                    "name": sanitize_name(source),
                }));
            }
            LlmMessage::Assistant {
                content: Completion::Text(text),
                ..
            } => {
                wire.push(json!({ "role": "assistant", "content": text }));
            }
            LlmMessage::Assistant {
                content: Completion::ToolCalls(calls),
                ..
            } => {
                let tool_calls: Vec<Value> = calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": { "name": c.name, "arguments": c.arguments },
                        })
                    })
                    .collect();
                wire.push(json!({
                    "role": "assistant",
                    "content": Value::Null,
                    "tool_calls": tool_calls,
                }));
            }
            LlmMessage::ToolResults(results) => {
                for result in results {
                    wire.push(json!({
                        "role": "tool",
                        "tool_call_id": result.call_id,
                        "content": result.content,
                    }));
                }
            }
        }
    }
    wire
}

pub(crate) fn build_request_body(
    config: &OpenAiClientConfig,
    messages: &[LlmMessage],
    tools: &[ToolSchema],
) -> Value {
    let mut body = json!({
        "model": config.model,
        "messages": wire_messages(messages),
        "stream": false,
    });

    if let Some(temperature) = config.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = config.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if !tools.is_empty() {
        let tools: Vec<Value> = tools
            .iter()
            .map(|tool| json!({ "type": "function", "function": tool }))
            .collect();
        body["tools"] = Value::Array(tools);
    }

    body
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

pub(crate) fn parse_response(text: &str) -> Result<CreateResult> {
    let response: ChatResponse = serde_json::from_str(text)
        .map_err(|e| RunnerError::model(format!("Malformed completion response: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RunnerError::model("Completion response has no choices"))?;

    let usage = response
        .usage
        .map(|u| RequestUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let tool_calls = choice.message.tool_calls.unwrap_or_default();
    let content = if !tool_calls.is_empty() {
        Completion::ToolCalls(
            tool_calls
                .into_iter()
                .map(|c| FunctionCall {
                    id: c.id,
                    name: c.function.name,
                    arguments: c.function.arguments,
                })
                .collect(),
        )
    } else {
        Completion::Text(choice.message.content.unwrap_or_default())
    };

    let finish_reason = match (&content, choice.finish_reason) {
        (Completion::ToolCalls(_), _) => "function_calls".to_string(),
        (_, Some(reason)) => reason,
        (_, None) => "unknown".to_string(),
    };

    Ok(CreateResult {
        content,
        finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentchat_core::message::FunctionExecutionResult;

    fn config() -> OpenAiClientConfig {
        OpenAiClientConfig {
            model: "gpt-4o".into(),
            api_key: None,
            base_url: None,
            organization: None,
            temperature: Some(0.2),
            max_tokens: None,
            timeout: None,
        }
    }

    #[test]
    fn test_request_body_carries_tools_and_names() {
        let messages = vec![
            LlmMessage::System("You are a planning agent.".into()),
            LlmMessage::User {
                content: "hello".into(),
                source: "web search".into(),
            },
        ];
        let tools = vec![ToolSchema {
            name: "search_web_tool".into(),
            description: "Search".into(),
            parameters: json!({ "type": "object" }),
        }];

        let body = build_request_body(&config(), &messages, &tools);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["name"], "web_search");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "search_web_tool");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_tool_round_trip_messages() {
        let messages = vec![
            LlmMessage::Assistant {
                content: Completion::ToolCalls(vec![FunctionCall {
                    id: "call_1".into(),
                    name: "refund_flight".into(),
                    arguments: "{}".into(),
                }]),
                source: "flights_refunder".into(),
            },
            LlmMessage::ToolResults(vec![FunctionExecutionResult {
                call_id: "call_1".into(),
                name: "refund_flight".into(),
                content: "Flight refunded".into(),
                is_error: false,
            }]),
        ];

        let body = build_request_body(&config(), &messages, &[]);
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["tool_calls"][0]["id"], "call_1");
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_parse_text_response() {
        let text = r#"{
            "choices": [{ "message": { "role": "assistant", "content": "TERMINATE" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        }"#;
        let result = parse_response(text).unwrap();
        assert_eq!(result.content, Completion::Text("TERMINATE".into()));
        assert_eq!(result.finish_reason, "stop");
        assert_eq!(result.usage.prompt_tokens, 12);
    }

    #[test]
    fn test_parse_tool_call_response() {
        let text = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": { "name": "percentage_change_tool", "arguments": "{\"start\":214,\"end\":398}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let result = parse_response(text).unwrap();
        match result.content {
            Completion::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "percentage_change_tool");
            }
            other => panic!("Expected tool calls, got: {:?}", other),
        }
        assert_eq!(result.finish_reason, "function_calls");
    }

    #[test]
    fn test_parse_empty_choices_is_error() {
        assert!(parse_response(r#"{"choices": []}"#).is_err());
        assert!(parse_response("not json").is_err());
    }

    #[test]
    fn test_dump_config_masks_api_key() {
        let source = ModelConfig::new(
            "openai",
            json!({ "model": "gpt-4o", "api_key": "sk-secret" }),
        );
        let client = OpenAiChatCompletionClient::from_config(&source).unwrap();
        let dumped = client.dump_config();
        assert_eq!(dumped.get_str("api_key"), Some(MASKED_SECRET));
        assert_eq!(client.model(), "gpt-4o");
    }

    #[test]
    fn test_missing_model_is_config_error() {
        let source = ModelConfig::new("openai", json!({ "api_key": "sk" }));
        assert!(matches!(
            OpenAiChatCompletionClient::from_config(&source),
            Err(RunnerError::Config(_))
        ));
    }

    #[test]
    fn test_unusable_timeout_is_config_error() {
        for timeout in [json!(-1), json!(1e300)] {
            let source = ModelConfig::new(
                "openai",
                json!({ "model": "gpt-4o", "api_key": "sk", "timeout": timeout }),
            );
            assert!(matches!(
                OpenAiChatCompletionClient::from_config(&source),
                Err(RunnerError::Config(_))
            ));
        }
    }

    #[test]
    fn test_fractional_timeout_accepted() {
        let source = ModelConfig::new(
            "openai",
            json!({ "model": "gpt-4o", "api_key": "sk", "timeout": 2.5 }),
        );
        assert!(OpenAiChatCompletionClient::from_config(&source).is_ok());
    }
}
