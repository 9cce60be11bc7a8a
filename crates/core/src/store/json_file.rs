//! Whole-file JSON documents
//!
//! Reads return a default when the file is absent; writes replace the file.
//! There is no locking: the last writer wins.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Result;

/// A JSON document stored in a single file
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, or `None` if the file does not exist
    pub async fn read<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Read the document, falling back to `T::default()` when absent
    pub async fn read_or_default<T: DeserializeOwned + Default>(&self) -> Result<T> {
        Ok(self.read().await?.unwrap_or_default())
    }

    /// Overwrite the file with `value`
    pub async fn write<T: Serialize + ?Sized>(&self, value: &T, pretty: bool) -> Result<()> {
        let content = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(&self.path, content).await?;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}
