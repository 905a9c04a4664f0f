//! Persisted sync state
//!
//! One JSON file holds last-sync instants and cached target ids. Every write
//! is a read-modify-write of the whole file; concurrent runs are last writer
//! wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

pub const STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub last_sync: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Current state; a missing file is an empty state.
    pub fn load(&self) -> SyncResult<SyncState> {
        let path = self.path();
        if !path.exists() {
            return Ok(SyncState::default());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(SyncState::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, state: &SyncState) -> SyncResult<()> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(state)?;
        fs::write(self.path(), content)?;
        Ok(())
    }

    pub fn update<F: FnOnce(&mut SyncState)>(&self, f: F) -> SyncResult<()> {
        let mut state = self.load()?;
        f(&mut state);
        self.save(&state)
    }

    pub fn last_sync(&self, menu: &str) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(self.load()?.last_sync.get(menu).copied())
    }

    pub fn record_sync(&self, menu: &str, at: DateTime<Utc>) -> SyncResult<()> {
        self.update(|s| {
            s.last_sync.insert(menu.to_string(), at);
        })
    }

    pub fn target(&self, menu: &str) -> SyncResult<Option<String>> {
        Ok(self.load()?.targets.get(menu).cloned())
    }

    pub fn set_target(&self, menu: &str, id: &str) -> SyncResult<()> {
        self.update(|s| {
            s.targets.insert(menu.to_string(), id.to_string());
        })
    }

    pub fn consolidated(&self) -> SyncResult<Option<String>> {
        Ok(self.load()?.consolidated)
    }

    pub fn set_consolidated(&self, id: &str) -> SyncResult<()> {
        self.update(|s| s.consolidated = Some(id.to_string()))
    }
}
