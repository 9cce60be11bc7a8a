//! Tools used by the sample teams

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;
use crate::error::{Result, RunnerError};

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| RunnerError::tool(tool, format!("invalid arguments: {}", e)))
}

/// Canned search results about the Miami Heat
pub struct SearchWebTool;

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

impl SearchWebTool {
    pub fn lookup(query: &str) -> &'static str {
        if query.contains("2006-2007") {
            "Here are the total points scored by Miami Heat players in the 2006-2007 season:\n\
             Udonis Haslem: 844 points\n\
             Dwayne Wade: 1397 points\n\
             James Posey: 550 points\n\
             ..."
        } else if query.contains("2007-2008") {
            "The number of total rebounds for Dwayne Wade in the Miami Heat season 2007-2008 is 214."
        } else if query.contains("2008-2009") {
            "The number of total rebounds for Dwayne Wade in the Miami Heat season 2008-2009 is 398."
        } else {
            "No data found."
        }
    }
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web_tool"
    }

    fn description(&self) -> &str {
        "Search the web for information."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string", "description": "query" } },
            "required": ["query"],
        })
    }

    async fn run(&self, args: Value) -> Result<String> {
        let args: SearchArgs = parse_args(self.name(), args)?;
        Ok(Self::lookup(&args.query).to_string())
    }
}

/// Percentage change between two values
pub struct PercentageChangeTool;

#[derive(Deserialize)]
struct PercentageArgs {
    start: f64,
    end: f64,
}

impl PercentageChangeTool {
    pub fn compute(start: f64, end: f64) -> Option<f64> {
        if start == 0.0 {
            return None;
        }
        Some(((end - start) / start) * 100.0)
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[async_trait]
impl Tool for PercentageChangeTool {
    fn name(&self) -> &str {
        "percentage_change_tool"
    }

    fn description(&self) -> &str {
        "Calculate the percentage change from start to end."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start": { "type": "number", "description": "start" },
                "end": { "type": "number", "description": "end" },
            },
            "required": ["start", "end"],
        })
    }

    async fn run(&self, args: Value) -> Result<String> {
        let args: PercentageArgs = parse_args(self.name(), args)?;
        Self::compute(args.start, args.end)
            .map(format_float)
            .ok_or_else(|| RunnerError::tool(self.name(), "float division by zero"))
    }
}

/// Mock flight refund
pub struct RefundFlightTool;

#[async_trait]
impl Tool for RefundFlightTool {
    fn name(&self) -> &str {
        "refund_flight"
    }

    fn description(&self) -> &str {
        "Refund a flight"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn run(&self, _args: Value) -> Result<String> {
        Ok("Flight refunded".to_string())
    }
}
