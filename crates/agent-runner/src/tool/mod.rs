//! Tools agents can call
//!
//! A tool is an async function with a JSON-schema description. Handoffs are
//! exposed to the model as tools too.

mod builtin;
mod handoff;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::model::ToolSchema;

pub use builtin::{PercentageChangeTool, RefundFlightTool, SearchWebTool};
pub use handoff::{Handoff, HandoffTool};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    /// Run with decoded arguments, returning the text shown to the model
    async fn run(&self, args: Value) -> Result<String>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}
