//! Agentchat Runner - agents, tools and group chat teams
//!
//! This crate runs multi-agent conversations: model clients, tool
//! functions, assistant and user proxy agents, termination conditions,
//! and the round-robin, selector and swarm team topologies.

pub mod agent;
mod error;
pub mod model;
pub mod samples;
pub mod team;
pub mod termination;
pub mod tool;

pub use agent::{AssistantAgent, ChannelInput, ChatAgent, EventSink, UserInput, UserProxyAgent};
pub use error::{Result, RunnerError};
pub use model::{
    create_model_client, load_model_client, ChatCompletionClient, Completion, CreateResult,
    LlmMessage, OpenAiChatCompletionClient, ReplayChatCompletionClient, ToolSchema,
};
pub use samples::{build_team, parse_team_kind, TeamKind};
pub use team::{GroupChatState, Team, TeamBuilder, TeamComponent, TeamEvent, Topology};
pub use termination::{
    HandoffTermination, MaxMessageTermination, OrTermination, StopMessage, TerminationCondition,
    TerminationConfig, TextMentionTermination,
};
pub use tool::{Handoff, Tool};
