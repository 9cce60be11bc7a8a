//! Group chat teams
//!
//! A team owns its participants, a termination condition and a topology
//! that decides who speaks next:
//! - Round-robin: participants take turns in order
//! - Selector: a model picks the next speaker from the conversation
//! - Swarm: the current speaker hands the turn off explicitly
//!
//! Runs execute on a spawned task and stream [`TeamEvent`]s through a
//! channel. Dropping the stream abandons the run at its next event.

mod component;
mod selector;
mod state;

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use agentchat_core::message::{ChatEvent, TaskResult, TextMessage, USER_SOURCE};

use crate::agent::{ChatAgent, EventSink};
use crate::error::{Result, RunnerError};
use crate::termination::TerminationCondition;

pub use component::{TeamComponent, TeamComponentConfig};
pub use selector::{SelectorConfig, DEFAULT_SELECTOR_PROMPT};
pub use state::GroupChatState;

/// Item yielded by [`Team::run_stream`]
#[derive(Debug, Clone)]
pub enum TeamEvent {
    Message(ChatEvent),
    /// Aggregate emitted once, after the last message
    TaskResult(TaskResult),
}

/// How the next speaker is chosen
#[derive(Clone)]
pub enum Topology {
    RoundRobin,
    Selector(SelectorConfig),
    Swarm,
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "RoundRobinGroupChat",
            Self::Selector(_) => "SelectorGroupChat",
            Self::Swarm => "Swarm",
        }
    }
}

pub struct TeamBuilder {
    topology: Topology,
    participants: Vec<Arc<dyn ChatAgent>>,
    termination: Option<Box<dyn TerminationCondition>>,
    max_turns: Option<usize>,
}

impl TeamBuilder {
    pub fn participant(mut self, agent: impl ChatAgent + 'static) -> Self {
        self.participants.push(Arc::new(agent));
        self
    }

    pub fn participants(mut self, agents: Vec<Arc<dyn ChatAgent>>) -> Self {
        self.participants.extend(agents);
        self
    }

    pub fn termination(mut self, condition: impl TerminationCondition + 'static) -> Self {
        self.termination = Some(Box::new(condition));
        self
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn build(self) -> Result<Team> {
        if self.participants.is_empty() {
            return Err(RunnerError::InvalidTeam(
                "At least one participant is required".into(),
            ));
        }

        let mut names = HashSet::new();
        for agent in &self.participants {
            if !names.insert(agent.name().to_string()) {
                return Err(RunnerError::InvalidTeam(format!(
                    "Duplicate participant name: {}",
                    agent.name()
                )));
            }
        }

        for agent in &self.participants {
            for target in agent.handoff_targets() {
                if target != USER_SOURCE && !names.contains(&target) {
                    return Err(RunnerError::InvalidTeam(format!(
                        "{} hands off to unknown participant {}",
                        agent.name(),
                        target
                    )));
                }
            }
        }

        if self.termination.is_none() && self.max_turns.is_none() {
            warn!("Team has no termination condition and no turn limit");
        }

        let state = GroupChatState {
            team_type: self.topology.as_str().to_string(),
            ..Default::default()
        };

        Ok(Team {
            inner: Arc::new(TeamInner {
                participants: self.participants,
                topology: self.topology,
                termination: Mutex::new(self.termination),
                max_turns: self.max_turns,
                state: Mutex::new(state),
            }),
        })
    }
}

struct TeamInner {
    participants: Vec<Arc<dyn ChatAgent>>,
    topology: Topology,
    termination: Mutex<Option<Box<dyn TerminationCondition>>>,
    max_turns: Option<usize>,
    state: Mutex<GroupChatState>,
}

/// A group of agents taking turns on a shared conversation
#[derive(Clone)]
pub struct Team {
    inner: Arc<TeamInner>,
}

impl Team {
    pub fn builder(topology: Topology) -> TeamBuilder {
        TeamBuilder {
            topology,
            participants: Vec::new(),
            termination: None,
            max_turns: None,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.inner.topology
    }

    pub fn participant_names(&self) -> Vec<&str> {
        self.inner.participants.iter().map(|a| a.name()).collect()
    }

    /// Run `task` and stream every event, ending with a [`TeamEvent::TaskResult`]
    pub fn run_stream(&self, task: TextMessage) -> ReceiverStream<Result<TeamEvent>> {
        let (tx, rx) = mpsc::channel(64);
        let team = self.clone();

        tokio::spawn(async move {
            if let Err(e) = team.run_inner(task, tx.clone()).await {
                match e {
                    RunnerError::ChannelClosed => debug!("Run abandoned: stream dropped"),
                    e => {
                        warn!("Team run failed: {}", e);
                        let _ = tx.send(Err(e)).await;
                    }
                }
            }
        });

        ReceiverStream::new(rx)
    }

    async fn run_inner(&self, task: TextMessage, tx: mpsc::Sender<Result<TeamEvent>>) -> Result<()> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        let mut termination = inner.termination.lock().await;
        if let Some(condition) = termination.as_mut() {
            condition.reset();
        }

        let mut sink = EventSink::new(tx);
        let task_event = ChatEvent::TextMessage(task);
        sink.emit(task_event.clone()).await?;
        sink.take();

        state.message_thread.push(task_event.clone());
        let mut run_messages = vec![task_event.clone()];
        let mut stop_reason = check(&mut termination, &[task_event]);
        let mut turns = 0usize;

        info!(
            "Starting {} run with {} participants",
            inner.topology.as_str(),
            inner.participants.len()
        );

        while stop_reason.is_none() {
            if let Some(max) = inner.max_turns {
                if turns >= max {
                    stop_reason = Some(format!("Maximum number of turns {} reached.", max));
                    break;
                }
            }

            let speaker = self.select_speaker(&mut state).await?;
            let agent = Arc::clone(&inner.participants[speaker]);
            debug!("Turn {} goes to {}", turns + 1, agent.name());

            let response = agent.respond(&state.message_thread, &mut sink).await?;
            let mut delta: Vec<ChatEvent> = sink
                .take()
                .into_iter()
                .filter(|e| !e.is_input_request())
                .collect();
            sink.emit(response.clone()).await?;
            sink.take();
            delta.push(response.clone());

            state.message_thread.extend(delta.iter().cloned());
            state.previous_speaker = Some(agent.name().to_string());
            state.current_turn += 1;
            run_messages.extend(delta.iter().cloned());

            if let (Topology::Swarm, ChatEvent::HandoffMessage(handoff)) = (&inner.topology, &response) {
                if inner.participants.iter().any(|a| a.name() == handoff.target) {
                    state.current_speaker = Some(handoff.target.clone());
                }
            }

            turns += 1;
            stop_reason = check(&mut termination, &delta);
        }

        info!("Run stopped: {}", stop_reason.as_deref().unwrap_or("unknown"));
        if let Some(condition) = termination.as_mut() {
            condition.reset();
        }

        sink.send(TeamEvent::TaskResult(TaskResult {
            messages: run_messages,
            stop_reason,
        }))
        .await
    }

    async fn select_speaker(&self, state: &mut GroupChatState) -> Result<usize> {
        let participants = &self.inner.participants;
        match &self.inner.topology {
            Topology::RoundRobin => {
                let index = state.next_speaker_index % participants.len();
                state.next_speaker_index = (index + 1) % participants.len();
                Ok(index)
            }
            Topology::Swarm => {
                let index = state
                    .current_speaker
                    .as_deref()
                    .and_then(|name| participants.iter().position(|a| a.name() == name))
                    .unwrap_or(0);
                state.current_speaker = Some(participants[index].name().to_string());
                Ok(index)
            }
            Topology::Selector(config) => {
                selector::select_speaker(
                    config,
                    participants,
                    &state.message_thread,
                    state.previous_speaker.as_deref(),
                )
                .await
            }
        }
    }

    /// Snapshot of the conversation and turn cursors
    pub async fn save_state(&self) -> GroupChatState {
        self.inner.state.lock().await.clone()
    }

    pub async fn load_state(&self, state: GroupChatState) -> Result<()> {
        let expected = self.inner.topology.as_str();
        if !state.team_type.is_empty() && state.team_type != expected {
            return Err(RunnerError::InvalidTeam(format!(
                "State was saved by a {} team, not {}",
                state.team_type, expected
            )));
        }
        let mut current = self.inner.state.lock().await;
        *current = GroupChatState {
            team_type: expected.to_string(),
            ..state
        };
        Ok(())
    }

    /// Clear the conversation and termination counters
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        *state = GroupChatState {
            team_type: self.inner.topology.as_str().to_string(),
            ..Default::default()
        };
        if let Some(condition) = self.inner.termination.lock().await.as_mut() {
            condition.reset();
        }
    }

    /// Describe the team's configuration
    pub async fn dump_config(&self) -> TeamComponent {
        let inner = &self.inner;
        let termination_condition = inner
            .termination
            .lock()
            .await
            .as_ref()
            .map(|c| c.dump_config());

        let (model_client, selector_prompt, allow_repeated_speaker) = match &inner.topology {
            Topology::Selector(config) => (
                Some(config.model_client.dump_config()),
                Some(config.selector_prompt.clone()),
                Some(config.allow_repeated_speaker),
            ),
            _ => (None, None, None),
        };

        TeamComponent {
            provider: inner.topology.as_str().to_string(),
            component_type: "team".to_string(),
            version: 1,
            label: inner.topology.as_str().to_string(),
            config: TeamComponentConfig {
                participants: inner.participants.iter().map(|a| a.dump_config()).collect(),
                termination_condition,
                max_turns: inner.max_turns,
                model_client,
                selector_prompt,
                allow_repeated_speaker,
            },
        }
    }
}

fn check(
    termination: &mut Option<Box<dyn TerminationCondition>>,
    delta: &[ChatEvent],
) -> Option<String> {
    termination
        .as_mut()
        .and_then(|c| c.check(delta))
        .map(|stop| stop.content)
}
