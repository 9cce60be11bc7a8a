//! Chat history file
//!
//! A JSON array of message envelopes. Records are kept opaque so that
//! entries written by older builds still load.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::json_file::JsonFile;
use crate::Result;

pub struct HistoryStore {
    file: JsonFile,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// All recorded envelopes, empty when no history exists yet
    pub async fn load(&self) -> Result<Vec<Value>> {
        self.file.read_or_default().await
    }

    /// Replace the history with `records`
    pub async fn save(&self, records: &[Value]) -> Result<()> {
        self.file.write(records, false).await
    }

    /// Append `events` to `base` and write the merged array
    pub async fn save_merged<T: Serialize>(&self, mut base: Vec<Value>, events: &[T]) -> Result<()> {
        for event in events {
            base.push(serde_json::to_value(event)?);
        }
        self.save(&base).await
    }
}
