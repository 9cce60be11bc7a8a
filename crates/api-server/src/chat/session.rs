//! Per-connection chat loop
//!
//! Frames that arrive while a run is in flight answer a pending user input
//! request; any other frame waits its turn and becomes the next task.

use futures::StreamExt;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use agentchat_core::message::{ChatEvent, TextMessage};
use agentchat_runner::{
    build_team, load_model_client, ChannelInput, GroupChatState, Team, TeamEvent, UserInput,
};

use super::envelope::ServerEnvelope;
use super::transport::ChatTransport;
use super::ChatError;
use crate::config::PersistMode;
use crate::state::AppState;

const INPUT_BUFFER: usize = 8;
const TASK_TYPE: &str = "TextMessage";

/// Where a connection is in its message cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    AwaitingMessage,
    RunningTeam,
    StreamingEvents,
    Persisting,
    ErrorRecovery,
}

pub struct ChatSession<T: ChatTransport> {
    transport: T,
    state: AppState,
    phase: ChatPhase,
    /// Frames received mid-run, oldest first
    pending: VecDeque<String>,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T, state: AppState) -> Self {
        Self {
            transport,
            state,
            phase: ChatPhase::AwaitingMessage,
            pending: VecDeque::new(),
        }
    }

    fn enter(&mut self, phase: ChatPhase) {
        debug!("Chat phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Serve messages until the client goes away
    pub async fn run(&mut self) {
        loop {
            self.enter(ChatPhase::AwaitingMessage);
            let frame = match self.pending.pop_front() {
                Some(frame) => frame,
                None => match self.transport.recv().await {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        info!("Client disconnected");
                        break;
                    }
                    Err(e) => {
                        self.abort(e).await;
                        break;
                    }
                },
            };

            let outcome = match parse_message(&frame) {
                Ok(task) => self.exchange(task).await,
                Err(e) => {
                    warn!("Rejecting malformed chat message: {}", e);
                    Err(e)
                }
            };

            match outcome {
                Ok(()) => {}
                Err(ChatError::Disconnected) => {
                    info!("Client disconnected during a run");
                    break;
                }
                Err(e @ ChatError::Transport(_)) => {
                    self.abort(e).await;
                    break;
                }
                Err(e) => {
                    self.enter(ChatPhase::ErrorRecovery);
                    error!("Chat exchange failed: {}", e);
                    if let Err(send_err) = self.send_error_pair(&e).await {
                        warn!("Could not report error to client: {}", send_err);
                        break;
                    }
                }
            }
        }
    }

    /// One message in, one full team run out
    async fn exchange(&mut self, task: TextMessage) -> Result<(), ChatError> {
        self.enter(ChatPhase::RunningTeam);
        let (input_tx, input) = ChannelInput::channel(INPUT_BUFFER);
        let team = prepare_team(&self.state, Arc::new(input)).await?;
        let history = self.state.history().load().await?;

        self.enter(ChatPhase::StreamingEvents);
        let events = self.stream_run(&team, task, input_tx).await?;

        self.enter(ChatPhase::Persisting);
        persist_run(&self.state, &team, history, &events).await?;
        info!("Exchange complete with {} new messages", events.len());
        Ok(())
    }

    /// Forward the run's events and answer its input requests
    async fn stream_run(
        &mut self,
        team: &Team,
        task: TextMessage,
        input_tx: mpsc::Sender<String>,
    ) -> Result<Vec<ChatEvent>, ChatError> {
        let mut stream = team.run_stream(task);
        let mut events = Vec::new();
        let mut awaiting_input = false;

        loop {
            tokio::select! {
                item = stream.next() => match item {
                    None => break,
                    Some(Ok(TeamEvent::TaskResult(result))) => {
                        debug!("Run stopped: {:?}", result.stop_reason);
                    }
                    Some(Ok(TeamEvent::Message(event))) => {
                        self.transport.send(serde_json::to_string(&event)?).await?;
                        if event.is_input_request() {
                            awaiting_input = true;
                            // Earlier frames answer first, in arrival order
                            while awaiting_input {
                                match self.pending.pop_front() {
                                    Some(frame) => awaiting_input = !deliver_input(&input_tx, &frame),
                                    None => break,
                                }
                            }
                        } else {
                            events.push(event);
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                },
                frame = self.transport.recv() => match frame? {
                    None => return Err(ChatError::Disconnected),
                    Some(frame) if awaiting_input => {
                        awaiting_input = !deliver_input(&input_tx, &frame);
                    }
                    Some(frame) => {
                        debug!("Queueing message received mid-run");
                        self.pending.push_back(frame);
                    }
                },
            }
        }

        Ok(events)
    }

    async fn send_envelope(&mut self, envelope: &ServerEnvelope) -> Result<(), ChatError> {
        self.transport.send(serde_json::to_string(envelope)?).await
    }

    async fn send_error_pair(&mut self, e: &ChatError) -> Result<(), ChatError> {
        self.send_envelope(&ServerEnvelope::error(e)).await?;
        self.send_envelope(&ServerEnvelope::retry_prompt()).await
    }

    async fn abort(&mut self, e: ChatError) {
        error!("Unexpected error: {}", e);
        let _ = self.send_envelope(&ServerEnvelope::unexpected(&e)).await;
    }
}

/// Fresh team for one message, resumed from saved state when enabled
async fn prepare_team(state: &AppState, input: Arc<dyn UserInput>) -> Result<Team, ChatError> {
    let config = state.config();
    let model_client = load_model_client(state.model_config_path()).await?;
    let team = build_team(config.team_kind, model_client, input)?;

    if config.resume_state {
        if let Some(saved) = state.team_state().read::<GroupChatState>().await? {
            debug!(
                "Resuming team with {} messages from {:?}",
                saved.message_thread.len(),
                state.team_state().path()
            );
            team.load_state(saved).await?;
        }
    }
    Ok(team)
}

async fn persist_run(
    state: &AppState,
    team: &Team,
    history: Vec<Value>,
    events: &[ChatEvent],
) -> Result<(), ChatError> {
    match state.config().persist_mode {
        PersistMode::State => {
            let saved = team.save_state().await;
            state.team_state().write(&saved, false).await?;
        }
        PersistMode::Config => {
            let dumped = team.dump_config().await;
            state.team_config().write(&dumped, true).await?;
        }
    }
    state.history().save_merged(history, events).await?;
    Ok(())
}

/// Decode a client frame; a `type`, when given, must be `TextMessage`
fn parse_message(frame: &str) -> Result<TextMessage, ChatError> {
    let value: Value = serde_json::from_str(frame)?;
    if let Some(kind) = value.get("type") {
        if kind.as_str() != Some(TASK_TYPE) {
            return Err(ChatError::UnexpectedType(kind.to_string()));
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Hand a frame to the waiting user proxy; false if it was unusable
fn deliver_input(input_tx: &mpsc::Sender<String>, frame: &str) -> bool {
    match parse_message(frame) {
        Ok(message) => match input_tx.try_send(message.content) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping user input: {}", e);
                false
            }
        },
        Err(e) => {
            warn!("Dropping malformed user input: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::state::{HISTORY_FILE, MODEL_CONFIG_FILE, STATE_FILE, TEAM_CONFIG_FILE};
    use agentchat_runner::TeamKind;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::task::JoinHandle;

    struct FakeTransport {
        incoming: mpsc::UnboundedReceiver<String>,
        outgoing: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl ChatTransport for FakeTransport {
        async fn recv(&mut self) -> Result<Option<String>, ChatError> {
            Ok(self.incoming.recv().await)
        }

        async fn send(&mut self, frame: String) -> Result<(), ChatError> {
            self.outgoing
                .send(frame)
                .map_err(|_| ChatError::Transport("client gone".into()))
        }
    }

    struct Client {
        tx: mpsc::UnboundedSender<String>,
        rx: mpsc::UnboundedReceiver<String>,
        session: JoinHandle<()>,
    }

    impl Client {
        fn send(&self, frame: Value) {
            self.tx.send(frame.to_string()).unwrap();
        }

        fn say(&self, content: &str) {
            self.send(serde_json::json!({"source": "user", "content": content}));
        }

        async fn frame(&mut self) -> Value {
            let raw = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                .await
                .expect("timed out waiting for a frame")
                .expect("session closed");
            serde_json::from_str(&raw).unwrap()
        }

        async fn frames(&mut self, n: usize) -> Vec<Value> {
            let mut frames = Vec::with_capacity(n);
            for _ in 0..n {
                frames.push(self.frame().await);
            }
            frames
        }

        async fn close(self) {
            drop(self.tx);
            tokio::time::timeout(Duration::from_secs(5), self.session)
                .await
                .expect("session did not stop")
                .unwrap();
        }
    }

    fn write_replay_config(dir: &TempDir, replies: &[&str]) {
        let mut yaml = String::from("provider: replay\nconfig:\n  chat_completions:");
        if replies.is_empty() {
            yaml.push_str(" []\n");
        } else {
            yaml.push('\n');
            for reply in replies {
                yaml.push_str(&format!("    - {:?}\n", reply));
            }
        }
        std::fs::write(dir.path().join(MODEL_CONFIG_FILE), yaml).unwrap();
    }

    fn connect(dir: &TempDir, configure: impl FnOnce(&mut ServerConfig)) -> Client {
        let mut config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            static_dir: dir.path().to_path_buf(),
            team_kind: TeamKind::RoundRobin,
            ..Default::default()
        };
        configure(&mut config);

        let (tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, rx) = mpsc::unbounded_channel();
        let transport = FakeTransport { incoming, outgoing };
        let state = AppState::new(config);
        let session = tokio::spawn(async move {
            ChatSession::new(transport, state).run().await;
        });
        Client { tx, rx, session }
    }

    fn read_json(dir: &TempDir, name: &str) -> Value {
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(name)).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_single_exchange_streams_and_persists() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Hello TERMINATE"]);
        let mut client = connect(&dir, |_| {});

        client.say("hi");
        let frames = client.frames(2).await;
        assert_eq!(frames[0]["type"], "TextMessage");
        assert_eq!(frames[0]["source"], "user");
        assert_eq!(frames[0]["content"], "hi");
        assert_eq!(frames[1]["source"], "assistant");
        assert_eq!(frames[1]["content"], "Hello TERMINATE");
        client.close().await;

        let history = read_json(&dir, HISTORY_FILE);
        assert_eq!(history.as_array().unwrap().len(), 2);

        let state = read_json(&dir, STATE_FILE);
        assert_eq!(state["team_type"], "RoundRobinGroupChat");
        assert_eq!(state["message_thread"].as_array().unwrap().len(), 2);
        assert!(!dir.path().join(TEAM_CONFIG_FILE).exists());
    }

    #[tokio::test]
    async fn test_history_concatenates_across_exchanges() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Done TERMINATE"]);
        let mut client = connect(&dir, |_| {});

        for i in 0..3 {
            client.say(&format!("message {}", i));
            let frames = client.frames(2).await;
            assert!(frames.iter().all(|f| f["type"] != "TaskResult"));
        }
        client.close().await;

        let history = read_json(&dir, HISTORY_FILE);
        let contents: Vec<&str> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["content"].as_str().unwrap())
            .collect();
        assert_eq!(
            contents,
            vec![
                "message 0",
                "Done TERMINATE",
                "message 1",
                "Done TERMINATE",
                "message 2",
                "Done TERMINATE"
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_pair_and_connection_stays_open() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Hi TERMINATE"]);
        let mut client = connect(&dir, |_| {});

        client.tx.send("{not json".to_string()).unwrap();
        let pair = client.frames(2).await;
        assert_eq!(pair[0]["type"], "error");
        assert_eq!(pair[0]["source"], "system");
        assert!(pair[0]["content"].as_str().unwrap().starts_with("Error: "));
        assert_eq!(pair[1]["type"], "UserInputRequestedEvent");
        assert_eq!(pair[1]["content"], "An error occurred. Please try again.");

        client.send(serde_json::json!({"content": "missing source"}));
        let pair = client.frames(2).await;
        assert_eq!(pair[0]["type"], "error");
        assert_eq!(pair[1]["type"], "UserInputRequestedEvent");

        client.say("hello");
        let frames = client.frames(2).await;
        assert_eq!(frames[1]["content"], "Hi TERMINATE");
        client.close().await;
    }

    #[tokio::test]
    async fn test_model_failure_sends_one_error_pair() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &[]);
        let mut client = connect(&dir, |_| {});

        client.say("hi");
        let frames = client.frames(3).await;
        assert_eq!(frames[0]["type"], "TextMessage");
        assert_eq!(frames[1]["type"], "error");
        assert!(frames[1]["content"]
            .as_str()
            .unwrap()
            .contains("No more mock responses available"));
        assert_eq!(frames[2]["type"], "UserInputRequestedEvent");
        assert_eq!(frames[2]["source"], "system");

        client.say("again");
        let frames = client.frames(3).await;
        assert_eq!(frames[0]["content"], "again");
        assert_eq!(frames[1]["type"], "error");
        client.close().await;

        assert!(!dir.path().join(HISTORY_FILE).exists());
    }

    #[tokio::test]
    async fn test_missing_model_config_reports_error() {
        let dir = TempDir::new().unwrap();
        let mut client = connect(&dir, |_| {});

        client.say("hi");
        let pair = client.frames(2).await;
        assert_eq!(pair[0]["type"], "error");
        assert_eq!(pair[1]["type"], "UserInputRequestedEvent");
        client.close().await;
    }

    #[tokio::test]
    async fn test_user_proxy_reads_mid_run_frames() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Hello", "Hello, say I"]);
        let mut client = connect(&dir, |_| {});

        client.say("greet me");
        let frames = client.frames(4).await;
        assert_eq!(frames[1]["source"], "assistant");
        assert_eq!(frames[2]["source"], "yoda");
        assert_eq!(frames[3]["type"], "UserInputRequestedEvent");
        assert_eq!(frames[3]["source"], "user");

        client.tx.send("garbage".to_string()).unwrap();
        client.say("Thanks TERMINATE");
        let reply = client.frame().await;
        assert_eq!(reply["type"], "TextMessage");
        assert_eq!(reply["content"], "Thanks TERMINATE");
        client.close().await;

        let history = read_json(&dir, HISTORY_FILE);
        let records = history.as_array().unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r["type"] != "UserInputRequestedEvent"));
    }

    #[tokio::test]
    async fn test_config_persist_mode_writes_team_description() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Ok TERMINATE"]);
        let mut client = connect(&dir, |c| c.persist_mode = PersistMode::Config);

        client.say("hi");
        client.frames(2).await;
        client.close().await;

        let raw = std::fs::read_to_string(dir.path().join(TEAM_CONFIG_FILE)).unwrap();
        assert!(raw.contains('\n'));
        let dumped: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(dumped["provider"], "RoundRobinGroupChat");
        assert_eq!(dumped["config"]["participants"][0]["name"], "assistant");
        assert!(!dir.path().join(STATE_FILE).exists());
    }

    #[tokio::test]
    async fn test_resume_state_extends_saved_thread() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Ok TERMINATE"]);
        let mut client = connect(&dir, |c| c.resume_state = true);

        client.say("first");
        client.frames(2).await;
        client.say("second");
        let frames = client.frames(2).await;
        assert_eq!(frames[1]["source"], "yoda");
        client.close().await;

        let state = read_json(&dir, STATE_FILE);
        assert_eq!(state["message_thread"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_disconnect_ends_session() {
        let dir = TempDir::new().unwrap();
        let client = connect(&dir, |_| {});
        client.close().await;
    }

    fn assert_send<F: std::future::Future + Send>(_: F) {}

    #[allow(dead_code)]
    fn websocket_session_is_send(session: &mut ChatSession<crate::chat::transport::WsTransport>) {
        assert_send(session.run());
    }

    #[tokio::test]
    async fn test_message_sent_mid_run_becomes_next_task() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Done TERMINATE"]);
        let mut client = connect(&dir, |c| c.team_kind = TeamKind::Swarm);

        client.say("task one");
        client.say("task two");
        let frames = client.frames(4).await;
        let contents: Vec<&str> = frames.iter().map(|f| f["content"].as_str().unwrap()).collect();
        assert_eq!(contents, vec!["task one", "Done TERMINATE", "task two", "Done TERMINATE"]);
        assert_eq!(frames[1]["source"], "travel_agent");
        client.close().await;

        let history = read_json(&dir, HISTORY_FILE);
        assert_eq!(history.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_early_reply_answers_next_input_request() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Hello", "Hello, say I"]);
        let mut client = connect(&dir, |_| {});

        client.say("greet me");
        client.say("Thanks TERMINATE");
        let frames = client.frames(5).await;
        assert_eq!(frames[3]["type"], "UserInputRequestedEvent");
        assert_eq!(frames[4]["source"], "user");
        assert_eq!(frames[4]["content"], "Thanks TERMINATE");
        client.close().await;

        let history = read_json(&dir, HISTORY_FILE);
        assert_eq!(history.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_non_text_message_type_rejected() {
        let dir = TempDir::new().unwrap();
        write_replay_config(&dir, &["Hi TERMINATE"]);
        let mut client = connect(&dir, |_| {});

        client.send(serde_json::json!({
            "type": "HandoffMessage",
            "source": "user",
            "target": "assistant",
            "content": "hi"
        }));
        let pair = client.frames(2).await;
        assert_eq!(pair[0]["type"], "error");
        assert!(pair[0]["content"].as_str().unwrap().contains("TextMessage"));
        assert_eq!(pair[1]["type"], "UserInputRequestedEvent");

        client.send(serde_json::json!({"type": "TextMessage", "source": "user", "content": "hi"}));
        let frames = client.frames(2).await;
        assert_eq!(frames[1]["content"], "Hi TERMINATE");
        client.close().await;
    }

    #[tokio::test]
    async fn test_invalid_client_timeout_reports_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(MODEL_CONFIG_FILE),
            "provider: openai\nconfig:\n  model: gpt-4o\n  api_key: sk-test\n  timeout: -1\n",
        )
        .unwrap();
        let mut client = connect(&dir, |_| {});

        client.say("hi");
        let pair = client.frames(2).await;
        assert_eq!(pair[0]["type"], "error");
        assert!(pair[0]["content"].as_str().unwrap().contains("timeout"));
        assert_eq!(pair[1]["type"], "UserInputRequestedEvent");
        client.close().await;
    }
}
