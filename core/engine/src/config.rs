//! Construction-time configuration of a [`DomDebugger`](crate::DomDebugger).

use crate::{
    error::StoreError,
    store::{JsonFileStore, MemoryStore, StickyStore},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Settings threaded through [`DomDebugger::from_config`](crate::DomDebugger::from_config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebuggerConfig {
    /// URL of the document being inspected when the session starts; the key
    /// sticky breakpoints are stored under.
    pub inspected_url: String,
    /// Where sticky breakpoints are persisted. `None` keeps them in memory.
    pub store_path: Option<PathBuf>,
    /// Whether breakpoint changes are written to the store at all.
    pub persist: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            inspected_url: "about:blank".to_owned(),
            store_path: None,
            persist: true,
        }
    }
}

impl DebuggerConfig {
    /// Configuration for inspecting `url`, with an in-memory store.
    #[must_use]
    pub fn new(inspected_url: impl Into<String>) -> Self {
        Self {
            inspected_url: inspected_url.into(),
            ..Self::default()
        }
    }

    /// Persists sticky breakpoints to `path`.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Reads a JSON configuration file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StoreError::Json { path, source })
    }

    /// Opens the store this configuration asks for.
    ///
    /// # Errors
    ///
    /// Fails if the configured store file exists but cannot be read.
    pub fn open_store(&self) -> Result<Box<dyn StickyStore>, StoreError> {
        Ok(match &self.store_path {
            Some(path) => Box::new(JsonFileStore::open(path.clone())?),
            None => Box::new(MemoryStore::new()),
        })
    }
}
