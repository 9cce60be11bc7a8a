//! Configuration module
//!
//! Model client settings loaded from YAML.

mod model;

pub use model::{ModelConfig, ModelProvider};
