//! Ready-made teams served by the chat endpoint

use std::sync::Arc;
use tracing::info;

use crate::agent::{AssistantAgent, ChatAgent, UserInput, UserProxyAgent};
use crate::error::{Result, RunnerError};
use crate::model::ChatCompletionClient;
use crate::team::{SelectorConfig, Team, Topology};
use crate::termination::{HandoffTermination, MaxMessageTermination, TextMentionTermination};
use crate::tool::{PercentageChangeTool, RefundFlightTool, SearchWebTool};

const STOP_WORD: &str = "TERMINATE";
const MAX_MESSAGES: usize = 10;

const ROLE_PLAY_PROMPT: &str = "You are in a role play game.
The following roles are available:

{roles}

Read the following conversation. Then select the next role from {participants} to play.
Only return the role.

{history}

Read the above conversation. Then select the next role from {participants} to play. Only return the role.
";

const PLANNING_SYSTEM_MESSAGE: &str = "You are a planning agent.
Your job is to break down complex tasks into smaller, manageable subtasks.
Your team members are:
    WebSearchAgent: Searches for information
    DataAnalystAgent: Performs calculations

You only plan and delegate tasks - you do not execute them yourself.

When assigning tasks, use this format:
1. <agent> : <task>

After all tasks are complete, summarize the findings and end with \"TERMINATE\".";

const WEB_SEARCH_SYSTEM_MESSAGE: &str = "You are a web search agent.
Your only tool is search_tool - use it to find information.
You make only one search call at a time.
Once you have the results, you never do calculations based on them.";

const DATA_ANALYST_SYSTEM_MESSAGE: &str = "You are a data analyst.
Given the tasks you have been assigned, you should analyze the data and provide results using the tools provided.
If you have not seen the data, ask for it.";

const TRAVEL_AGENT_SYSTEM_MESSAGE: &str = "You are a travel agent.
The flights_refunder is in charge of refunding flights.
If you need information from the user, you must first send your message, then you can handoff to the user.
Use TERMINATE when the travel planning is complete.";

const FLIGHTS_REFUNDER_SYSTEM_MESSAGE: &str = "You are an agent specialized in refunding flights.
You only need flight reference numbers to refund a flight.
You have the ability to refund a flight using the refund_flight tool.
If you need information from the user, you must first send your message, then you can handoff to the user.
When the transaction is complete, handoff to the travel agent to finalize.";

/// Which preset team a connection talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeamKind {
    #[default]
    Selector,
    RoundRobin,
    Swarm,
}

impl TeamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selector => "selector",
            Self::RoundRobin => "round_robin",
            Self::Swarm => "swarm",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "selector" => Some(Self::Selector),
            "round_robin" | "roundrobin" => Some(Self::RoundRobin),
            "swarm" => Some(Self::Swarm),
            _ => None,
        }
    }
}

pub fn planning_agent(client: Arc<dyn ChatCompletionClient>) -> AssistantAgent {
    AssistantAgent::new("PlanningAgent", client)
        .with_description(
            "An agent for planning tasks, this agent should be the first to engage when given a new task.",
        )
        .with_system_message(PLANNING_SYSTEM_MESSAGE)
}

pub fn web_search_agent(client: Arc<dyn ChatCompletionClient>) -> AssistantAgent {
    AssistantAgent::new("WebSearchAgent", client)
        .with_description("An agent for searching information on the web.")
        .with_system_message(WEB_SEARCH_SYSTEM_MESSAGE)
        .with_tool(SearchWebTool)
}

pub fn data_analyst_agent(client: Arc<dyn ChatCompletionClient>) -> AssistantAgent {
    AssistantAgent::new("DataAnalystAgent", client)
        .with_description("An agent for performing calculations.")
        .with_system_message(DATA_ANALYST_SYSTEM_MESSAGE)
        .with_tool(PercentageChangeTool)
}

pub fn travel_agent(client: Arc<dyn ChatCompletionClient>) -> AssistantAgent {
    AssistantAgent::new("travel_agent", client)
        .with_system_message(TRAVEL_AGENT_SYSTEM_MESSAGE)
        .with_handoffs(["flights_refunder", "user"])
}

pub fn flights_refunder(client: Arc<dyn ChatCompletionClient>) -> AssistantAgent {
    AssistantAgent::new("flights_refunder", client)
        .with_system_message(FLIGHTS_REFUNDER_SYSTEM_MESSAGE)
        .with_tool(RefundFlightTool)
        .with_handoffs(["travel_agent", "user"])
}

/// Build a fresh preset team around one model client
///
/// `input` feeds any user proxy in the team.
pub fn build_team(
    kind: TeamKind,
    model_client: Arc<dyn ChatCompletionClient>,
    input: Arc<dyn UserInput>,
) -> Result<Team> {
    info!("Building {} team", kind.as_str());
    let team = match kind {
        TeamKind::Selector => Team::builder(Topology::Selector(
            SelectorConfig::new(Arc::clone(&model_client))
                .with_prompt(ROLE_PLAY_PROMPT)
                .with_allow_repeated_speaker(false),
        ))
        .participant(planning_agent(Arc::clone(&model_client)))
        .participant(web_search_agent(Arc::clone(&model_client)))
        .participant(data_analyst_agent(model_client))
        .termination(TextMentionTermination::new(STOP_WORD) | MaxMessageTermination::new(MAX_MESSAGES))
        .build()?,
        TeamKind::RoundRobin => {
            let participants: Vec<Arc<dyn ChatAgent>> = vec![
                Arc::new(
                    AssistantAgent::new("assistant", Arc::clone(&model_client))
                        .with_system_message("You are a helpful assistant."),
                ),
                Arc::new(
                    AssistantAgent::new("yoda", model_client)
                        .with_system_message("Repeat the same message in the tone of Yoda."),
                ),
                Arc::new(UserProxyAgent::new("user", input)),
            ];
            Team::builder(Topology::RoundRobin)
                .participants(participants)
                .termination(
                    TextMentionTermination::new(STOP_WORD) | MaxMessageTermination::new(MAX_MESSAGES),
                )
                .build()?
        }
        TeamKind::Swarm => Team::builder(Topology::Swarm)
            .participant(travel_agent(Arc::clone(&model_client)))
            .participant(flights_refunder(model_client))
            .termination(HandoffTermination::new("user") | TextMentionTermination::new(STOP_WORD))
            .build()?,
    };
    Ok(team)
}

/// Parse a team kind, naming the accepted values on failure
pub fn parse_team_kind(s: &str) -> Result<TeamKind> {
    TeamKind::from_str(s).ok_or_else(|| {
        RunnerError::Config(format!(
            "Unknown team kind '{}', expected one of: selector, round_robin, swarm",
            s
        ))
    })
}
