//! Model client configuration
//!
//! The file follows the component layout used by the chat samples:
//!
//! ```yaml
//! provider: autogen_ext.models.openai.OpenAIChatCompletionClient
//! config:
//!   model: gpt-4o
//!   api_key: sk-...
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::{Error, Result};

/// Known model client providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    /// Any service exposing the OpenAI chat completions API
    OpenAi,
    /// Scripted completions, no network
    Replay,
}

impl ModelProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        let short = s.rsplit('.').next().unwrap_or(s);
        match short.to_lowercase().as_str() {
            "openai" | "openaichatcompletionclient" | "azureopenaichatcompletionclient" => {
                Ok(Self::OpenAi)
            }
            "replay" | "replaychatcompletionclient" => Ok(Self::Replay),
            _ => Err(Error::Config(format!("Unknown model provider: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Replay => "replay",
        }
    }
}

/// Model client configuration as found in `model_config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Provider-specific settings, handed to the client constructor as-is
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ModelConfig {
    pub fn new(provider: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            provider: provider.into(),
            component_type: Some("model".to_string()),
            version: None,
            component_version: None,
            description: None,
            label: None,
            config,
        }
    }

    /// Parse a config from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: ModelConfig = serde_yaml::from_str(content)?;
        config.provider()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading model config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn provider(&self) -> Result<ModelProvider> {
        ModelProvider::from_str(&self.provider)
    }

    /// Look up a string field of the provider settings
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OPENAI_YAML: &str = r#"
provider: autogen_ext.models.openai.OpenAIChatCompletionClient
component_type: model
config:
  model: gpt-4o
  api_key: sk-test
  base_url: http://localhost:11434/v1
"#;

    #[test]
    fn test_parse_openai_config() {
        let config = ModelConfig::from_yaml_str(OPENAI_YAML).unwrap();
        assert_eq!(config.provider().unwrap(), ModelProvider::OpenAi);
        assert_eq!(config.get_str("model"), Some("gpt-4o"));
        assert_eq!(config.get_str("base_url"), Some("http://localhost:11434/v1"));
        assert_eq!(config.component_type.as_deref(), Some("model"));
    }

    #[test]
    fn test_parse_replay_config() {
        let yaml = r#"
provider: replay
config:
  chat_completions:
    - "Hello TERMINATE"
"#;
        let config = ModelConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.provider().unwrap(), ModelProvider::Replay);
        assert!(config.config["chat_completions"].is_array());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let yaml = "provider: some.vendor.Client\nconfig: {}\n";
        match ModelConfig::from_yaml_str(yaml) {
            Err(Error::Config(msg)) => assert!(msg.contains("some.vendor.Client")),
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        let result = ModelConfig::from_yaml_str("provider: [unclosed");
        assert!(matches!(result, Err(Error::Yaml(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model_config.yaml");
        tokio::fs::write(&path, OPENAI_YAML).await.unwrap();

        let config = ModelConfig::load(&path).await.unwrap();
        assert_eq!(config.get_str("api_key"), Some("sk-test"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ModelConfig::load(temp_dir.path().join("missing.yaml")).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
