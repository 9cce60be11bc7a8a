//! Model-backed assistant agent

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use agentchat_core::message::{
    ChatEvent, FunctionCall, FunctionExecutionResult, HandoffMessage, TextMessage,
    ToolCallExecutionEvent, ToolCallRequestEvent, ToolCallSummaryMessage,
};

use super::{AgentComponent, ChatAgent, EventSink};
use crate::error::{Result, RunnerError};
use crate::model::{ChatCompletionClient, Completion, LlmMessage, ToolSchema};
use crate::tool::{Handoff, Tool};

pub const DEFAULT_DESCRIPTION: &str =
    "An agent that provides assistance with ability to use tools.";

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful AI assistant. Solve tasks using your tools. Reply with TERMINATE when the task has been completed.";

pub struct AssistantAgent {
    name: String,
    description: String,
    system_message: String,
    model_client: Arc<dyn ChatCompletionClient>,
    tools: Vec<Arc<dyn Tool>>,
    handoffs: Vec<Handoff>,
    reflect_on_tool_use: bool,
}

impl AssistantAgent {
    pub fn new(name: impl Into<String>, model_client: Arc<dyn ChatCompletionClient>) -> Self {
        Self {
            name: name.into(),
            description: DEFAULT_DESCRIPTION.to_string(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            model_client,
            tools: Vec::new(),
            handoffs: Vec::new(),
            reflect_on_tool_use: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_handoffs<I, H>(mut self, handoffs: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<Handoff>,
    {
        self.handoffs.extend(handoffs.into_iter().map(Into::into));
        self
    }

    pub fn with_reflect_on_tool_use(mut self, reflect: bool) -> Self {
        self.reflect_on_tool_use = reflect;
        self
    }

    fn tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| t.schema())
            .chain(self.handoffs.iter().map(|h| h.tool().schema()))
            .collect()
    }

    /// Model context for this agent's view of the thread
    pub(crate) fn build_context(&self, thread: &[ChatEvent]) -> Vec<LlmMessage> {
        let mut context = Vec::with_capacity(thread.len() + 1);
        if !self.system_message.is_empty() {
            context.push(LlmMessage::System(self.system_message.clone()));
        }

        for event in thread {
            let own = event.source() == self.name;
            match event {
                ChatEvent::TextMessage(_)
                | ChatEvent::ToolCallSummaryMessage(_)
                | ChatEvent::HandoffMessage(_) => {
                    let content = event.to_text();
                    if own {
                        context.push(LlmMessage::Assistant {
                            content: Completion::Text(content),
                            source: self.name.clone(),
                        });
                    } else {
                        context.push(LlmMessage::User {
                            content,
                            source: event.source().to_string(),
                        });
                    }
                }
                ChatEvent::ToolCallRequestEvent(e) if own => {
                    context.push(LlmMessage::Assistant {
                        content: Completion::ToolCalls(e.content.clone()),
                        source: self.name.clone(),
                    });
                }
                ChatEvent::ToolCallExecutionEvent(e) if own => {
                    context.push(LlmMessage::ToolResults(e.content.clone()));
                }
                _ => {}
            }
        }

        context
    }

    async fn execute_call(&self, call: &FunctionCall) -> FunctionExecutionResult {
        let outcome = match parse_arguments(&call.arguments) {
            Ok(args) => self.run_tool(&call.name, args).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(content) => FunctionExecutionResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content,
                is_error: false,
            },
            Err(e) => {
                warn!("Tool call {} from {} failed: {}", call.name, self.name, e);
                FunctionExecutionResult {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: format!("Error: {}", e),
                    is_error: true,
                }
            }
        }
    }

    async fn run_tool(&self, name: &str, args: Value) -> Result<String> {
        if let Some(handoff) = self.handoffs.iter().find(|h| h.name == name) {
            return handoff.tool().run(args).await;
        }
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.run(args).await,
            None => Err(RunnerError::tool(
                name,
                format!("The tool '{}' is not available.", name),
            )),
        }
    }
}

fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
        .map_err(|e| RunnerError::tool("arguments", format!("invalid JSON arguments: {}", e)))
}

#[async_trait]
impl ChatAgent for AssistantAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn handoff_targets(&self) -> Vec<String> {
        self.handoffs.iter().map(|h| h.target.clone()).collect()
    }

    async fn respond(&self, thread: &[ChatEvent], sink: &mut EventSink) -> Result<ChatEvent> {
        let mut context = self.build_context(thread);
        let tools = self.tool_schemas();
        debug!("{} calling model with {} messages", self.name, context.len());

        let result = self.model_client.create(&context, &tools).await?;
        let calls = match result.content {
            Completion::Text(text) => {
                return Ok(TextMessage::new(&self.name, text)
                    .with_usage(Some(result.usage))
                    .into());
            }
            Completion::ToolCalls(calls) => calls,
        };

        sink.emit(ChatEvent::ToolCallRequestEvent(ToolCallRequestEvent {
            source: self.name.clone(),
            models_usage: Some(result.usage),
            content: calls.clone(),
        }))
        .await?;

        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            results.push(self.execute_call(call).await);
        }

        sink.emit(ChatEvent::ToolCallExecutionEvent(ToolCallExecutionEvent {
            source: self.name.clone(),
            models_usage: None,
            content: results.clone(),
        }))
        .await?;

        let requested: Vec<&Handoff> = calls
            .iter()
            .filter_map(|c| self.handoffs.iter().find(|h| h.name == c.name))
            .collect();
        if let Some(handoff) = requested.first() {
            if requested.len() > 1 {
                warn!(
                    "{} requested {} handoffs, using the first: {}",
                    self.name,
                    requested.len(),
                    handoff.target
                );
            }
            return Ok(HandoffMessage {
                source: self.name.clone(),
                models_usage: None,
                target: handoff.target.clone(),
                content: handoff.message.clone(),
            }
            .into());
        }

        if self.reflect_on_tool_use {
            context.push(LlmMessage::Assistant {
                content: Completion::ToolCalls(calls),
                source: self.name.clone(),
            });
            context.push(LlmMessage::ToolResults(results));
            let reflection = self.model_client.create(&context, &[]).await?;
            return match reflection.content {
                Completion::Text(text) => Ok(TextMessage::new(&self.name, text)
                    .with_usage(Some(reflection.usage))
                    .into()),
                Completion::ToolCalls(_) => Err(RunnerError::model(
                    "Reflection on tool use returned tool calls instead of text",
                )),
            };
        }

        let summary = results
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ChatEvent::ToolCallSummaryMessage(ToolCallSummaryMessage {
            source: self.name.clone(),
            models_usage: None,
            content: summary,
        }))
    }

    fn dump_config(&self) -> AgentComponent {
        AgentComponent {
            provider: "AssistantAgent".to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            system_message: Some(self.system_message.clone()),
            tools: self.tools.iter().map(|t| t.schema()).collect(),
            handoffs: self.handoff_targets(),
            model_client: Some(self.model_client.dump_config()),
            reflect_on_tool_use: self.reflect_on_tool_use,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReplayChatCompletionClient, ReplayResponse, ReplayToolCall};
    use crate::tool::{PercentageChangeTool, SearchWebTool};
    use serde_json::json;

    fn tool_call(name: &str, arguments: Value) -> ReplayResponse {
        ReplayResponse::ToolCalls {
            tool_calls: vec![ReplayToolCall {
                id: None,
                name: name.into(),
                arguments,
            }],
        }
    }

    #[tokio::test]
    async fn test_text_reply() {
        let client = Arc::new(ReplayChatCompletionClient::from_texts(["Hello there"]));
        let agent = AssistantAgent::new("assistant", client);
        let mut sink = EventSink::detached();

        let thread = vec![TextMessage::new("user", "hi").into()];
        let response = agent.respond(&thread, &mut sink).await.unwrap();

        match response {
            ChatEvent::TextMessage(m) => {
                assert_eq!(m.source, "assistant");
                assert_eq!(m.content, "Hello there");
            }
            other => panic!("Expected TextMessage, got: {:?}", other),
        }
        assert!(sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_produces_summary() {
        let client = Arc::new(ReplayChatCompletionClient::new(vec![tool_call(
            "search_web_tool",
            json!({ "query": "2007-2008 rebounds" }),
        )]));
        let agent = AssistantAgent::new("WebSearchAgent", client).with_tool(SearchWebTool);
        let mut sink = EventSink::detached();

        let response = agent.respond(&[], &mut sink).await.unwrap();
        let events = sink.take();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].type_name(), "ToolCallRequestEvent");
        assert_eq!(events[1].type_name(), "ToolCallExecutionEvent");

        match response {
            ChatEvent::ToolCallSummaryMessage(m) => assert!(m.content.ends_with("is 214.")),
            other => panic!("Expected ToolCallSummaryMessage, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failing_tool_is_reported_not_raised() {
        let client = Arc::new(ReplayChatCompletionClient::new(vec![tool_call(
            "percentage_change_tool",
            json!({ "start": 0, "end": 10 }),
        )]));
        let agent = AssistantAgent::new("DataAnalystAgent", client).with_tool(PercentageChangeTool);
        let mut sink = EventSink::detached();

        agent.respond(&[], &mut sink).await.unwrap();
        let events = sink.take();
        match &events[1] {
            ChatEvent::ToolCallExecutionEvent(e) => {
                assert!(e.content[0].is_error);
                assert!(e.content[0].content.starts_with("Error:"));
            }
            other => panic!("Expected ToolCallExecutionEvent, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported() {
        let client = Arc::new(ReplayChatCompletionClient::new(vec![tool_call(
            "launch_rocket",
            json!({}),
        )]));
        let agent = AssistantAgent::new("assistant", client);
        let mut sink = EventSink::detached();

        let response = agent.respond(&[], &mut sink).await.unwrap();
        assert!(response.to_text().contains("not available"));
    }

    #[tokio::test]
    async fn test_handoff_call_returns_handoff_message() {
        let client = Arc::new(ReplayChatCompletionClient::new(vec![tool_call(
            "transfer_to_flights_refunder",
            Value::Null,
        )]));
        let agent = AssistantAgent::new("travel_agent", client)
            .with_handoffs(["flights_refunder", "user"]);
        assert_eq!(agent.handoff_targets(), vec!["flights_refunder", "user"]);

        let mut sink = EventSink::detached();
        let response = agent.respond(&[], &mut sink).await.unwrap();
        match response {
            ChatEvent::HandoffMessage(m) => {
                assert_eq!(m.source, "travel_agent");
                assert_eq!(m.target, "flights_refunder");
            }
            other => panic!("Expected HandoffMessage, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reflect_on_tool_use_calls_model_again() {
        let client = Arc::new(ReplayChatCompletionClient::new(vec![
            tool_call("search_web_tool", json!({ "query": "2008-2009" })),
            ReplayResponse::Text("Wade had 398 rebounds.".into()),
        ]));
        let agent = AssistantAgent::new("WebSearchAgent", client)
            .with_tool(SearchWebTool)
            .with_reflect_on_tool_use(true);
        let mut sink = EventSink::detached();

        let response = agent.respond(&[], &mut sink).await.unwrap();
        assert_eq!(response.type_name(), "TextMessage");
        assert_eq!(response.to_text(), "Wade had 398 rebounds.");
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let client = Arc::new(ReplayChatCompletionClient::new(Vec::new()));
        let agent = AssistantAgent::new("assistant", client);
        let mut sink = EventSink::detached();
        assert!(matches!(
            agent.respond(&[], &mut sink).await,
            Err(RunnerError::Model(_))
        ));
    }

    #[test]
    fn test_context_maps_own_and_foreign_messages() {
        let client = Arc::new(ReplayChatCompletionClient::new(Vec::new()));
        let agent = AssistantAgent::new("yoda", client).with_system_message("Speak like Yoda.");

        let thread: Vec<ChatEvent> = vec![
            TextMessage::new("user", "hello").into(),
            TextMessage::new("yoda", "Hello, you say.").into(),
            ChatEvent::ToolCallRequestEvent(ToolCallRequestEvent {
                source: "assistant".into(),
                models_usage: None,
                content: Vec::new(),
            }),
        ];
        let context = agent.build_context(&thread);

        assert_eq!(context.len(), 3);
        assert_eq!(context[0], LlmMessage::System("Speak like Yoda.".into()));
        assert!(matches!(&context[1], LlmMessage::User { source, .. } if source == "user"));
        assert!(matches!(&context[2], LlmMessage::Assistant { .. }));
    }
}
