//! Handoff declarations
//!
//! Each handoff target becomes a `transfer_to_<target>` tool; calling it
//! ends the agent's turn with a handoff message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Tool;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    pub target: String,
    pub description: String,
    pub name: String,
    pub message: String,
}

impl Handoff {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            description: format!("Handoff to {}.", target),
            name: format!("transfer_to_{}", target.to_lowercase()),
            message: format!(
                "Transferred to {}, adopting the role of {} immediately.",
                target, target
            ),
            target,
        }
    }

    pub fn tool(&self) -> HandoffTool {
        HandoffTool {
            handoff: self.clone(),
        }
    }
}

impl From<&str> for Handoff {
    fn from(target: &str) -> Self {
        Self::new(target)
    }
}

pub struct HandoffTool {
    handoff: Handoff,
}

#[async_trait]
impl Tool for HandoffTool {
    fn name(&self) -> &str {
        &self.handoff.name
    }

    fn description(&self) -> &str {
        &self.handoff.description
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn run(&self, _args: Value) -> Result<String> {
        Ok(self.handoff.message.clone())
    }
}
