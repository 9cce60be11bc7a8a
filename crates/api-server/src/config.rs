//! Server configuration from the environment

use serde::Serialize;
use std::path::PathBuf;

use agentchat_runner::TeamKind;

pub const DEFAULT_PORT: u16 = 8002;

/// What gets written after a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Team state to `team_state.json`
    #[default]
    State,
    /// Pretty-printed team description to `travel_team.json`
    Config,
}

impl PersistMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Config => "config",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "state" => Some(Self::State),
            "config" => Some(Self::Config),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub port: u16,
    pub team_kind: TeamKind,
    pub persist_mode: PersistMode,
    pub resume_state: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            static_dir: PathBuf::from("."),
            port: DEFAULT_PORT,
            team_kind: TeamKind::default(),
            persist_mode: PersistMode::default(),
            resume_state: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env_path("AGENTCHAT_DATA_DIR").unwrap_or(defaults.data_dir),
            static_dir: env_path("AGENTCHAT_STATIC_DIR").unwrap_or(defaults.static_dir),
            port: env_parsed("AGENTCHAT_PORT", |raw| raw.parse().ok()).unwrap_or(defaults.port),
            team_kind: env_parsed("AGENTCHAT_TEAM", TeamKind::from_str)
                .unwrap_or(defaults.team_kind),
            persist_mode: env_parsed("AGENTCHAT_PERSIST", PersistMode::from_str)
                .unwrap_or(defaults.persist_mode),
            resume_state: env_flag("AGENTCHAT_RESUME_STATE", defaults.resume_state),
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .map(PathBuf::from)
}

fn env_parsed<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!("Ignoring invalid {}={:?}", name, raw);
    }
    parsed
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
