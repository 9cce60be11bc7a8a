//! Persistent group chat state

use serde::{Deserialize, Serialize};

use agentchat_core::message::ChatEvent;

/// Everything a team needs to pick up a conversation where it left off
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupChatState {
    /// Topology that produced this state
    #[serde(default)]
    pub team_type: String,
    #[serde(default)]
    pub message_thread: Vec<ChatEvent>,
    #[serde(default)]
    pub current_turn: usize,
    /// Round-robin cursor
    #[serde(default)]
    pub next_speaker_index: usize,
    #[serde(default)]
    pub previous_speaker: Option<String>,
    /// Swarm speaker holding the turn
    #[serde(default)]
    pub current_speaker: Option<String>,
}
