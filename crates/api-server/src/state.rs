//! Application state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentchat_core::store::{HistoryStore, JsonFile};

use crate::config::ServerConfig;

pub const MODEL_CONFIG_FILE: &str = "model_config.yaml";
pub const STATE_FILE: &str = "team_state.json";
pub const TEAM_CONFIG_FILE: &str = "travel_team.json";
pub const HISTORY_FILE: &str = "team_history.json";
pub const INDEX_FILE: &str = "app_team.html";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    history: HistoryStore,
    team_state: JsonFile,
    team_config: JsonFile,
}

impl AppState {
    /// Create a new AppState rooted at the configured data directory
    pub fn new(config: ServerConfig) -> Self {
        let data_dir = config.data_dir.clone();
        Self {
            inner: Arc::new(AppStateInner {
                history: HistoryStore::new(data_dir.join(HISTORY_FILE)),
                team_state: JsonFile::new(data_dir.join(STATE_FILE)),
                team_config: JsonFile::new(data_dir.join(TEAM_CONFIG_FILE)),
                config,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.inner.history
    }

    pub fn team_state(&self) -> &JsonFile {
        &self.inner.team_state
    }

    pub fn team_config(&self) -> &JsonFile {
        &self.inner.team_config
    }

    pub fn model_config_path(&self) -> PathBuf {
        self.inner.config.data_dir.join(MODEL_CONFIG_FILE)
    }

    pub fn static_dir(&self) -> &Path {
        &self.inner.config.static_dir
    }
}
