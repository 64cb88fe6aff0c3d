use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::record::{SyncRunRecord, SyncTrigger};

/// Maximum number of sync runs to keep in history
const MAX_HISTORY_SIZE: usize = 20;

/// Rolling history of sync passes, persisted as JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncHistory {
    /// Most recent first
    pub runs: Vec<SyncRunRecord>,
}

impl SyncHistory {
    fn history_file_path() -> Result<PathBuf> {
        crate::config::ConfigManager::sync_history_path()
    }

    /// Load history from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::history_file_path()?)
    }

    /// Load history from `path`, empty if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).with_context(|| {
            format!("Failed to read sync history from: {}", path.display())
        })?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse sync history JSON from: {}", path.display()))
    }

    /// Save history to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize sync history")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write sync history to: {}", path.display()))
    }

    /// Add a run, dropping the oldest entries beyond the size limit
    pub fn add_run(&mut self, record: SyncRunRecord) {
        self.runs.insert(0, record);
        self.runs.truncate(MAX_HISTORY_SIZE);
    }

    /// Load, append and save in one step
    pub fn append_to(path: &Path, record: SyncRunRecord) -> Result<()> {
        let mut history = Self::load_from(path)?;
        history.add_run(record);
        history.save_to(path)
    }

    pub fn last_run(&self) -> Option<&SyncRunRecord> {
        self.runs.first()
    }

    pub fn last_run_by_trigger(&self, trigger: SyncTrigger) -> Option<&SyncRunRecord> {
        self.runs.iter().find(|run| run.trigger == trigger)
    }

    pub fn list_runs(&self) -> &[SyncRunRecord] {
        &self.runs
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
