//! Serializable team description

use serde::{Deserialize, Serialize};

use agentchat_core::config::ModelConfig;

use crate::agent::AgentComponent;
use crate::termination::TerminationConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamComponent {
    pub provider: String,
    pub component_type: String,
    pub version: u32,
    pub label: String,
    pub config: TeamComponentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamComponentConfig {
    pub participants: Vec<AgentComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_condition: Option<TerminationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_client: Option<ModelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_repeated_speaker: Option<bool>,
}
