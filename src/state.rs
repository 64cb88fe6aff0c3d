use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

use crate::config::ConfigManager;

/// Connectivity state remembered between command invocations
///
/// The CLI is a sequence of short-lived processes, so whether the user last
/// declared the app online is persisted in `state.json` next to the settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AppState {
    /// Whether the sync driver should start in online mode
    #[serde(default)]
    pub online: bool,

    /// When a sync pass last wrote at least one operation to the remote
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl AppState {
    /// Load the state from the config directory, defaulting when missing
    pub fn load() -> Result<Self> {
        Self::load_from(&ConfigManager::state_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read app state")?;
        let state = serde_json::from_str(&content).context("Failed to parse app state")?;
        Ok(state)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&ConfigManager::state_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize app state")?;
        fs::write(path, content).context("Failed to write app state")?;
        Ok(())
    }

    /// Stamp the last sync time if `synced` operations reached the remote
    pub fn record_sync(&mut self, synced: usize) {
        if synced > 0 {
            self.last_sync = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_offline() {
        let dir = TempDir::new().unwrap();
        let state = AppState::load_from(&dir.path().join("state.json")).unwrap();
        assert!(!state.online);
        assert!(state.last_sync.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = AppState {
            online: true,
            last_sync: None,
        };
        state.record_sync(0);
        assert!(state.last_sync.is_none());
        state.record_sync(2);
        state.save_to(&path).unwrap();

        let loaded = AppState::load_from(&path).unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.last_sync.is_some());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{\"online\": true}").unwrap();

        let state = AppState::load_from(&path).unwrap();
        assert!(state.online);
        assert!(state.last_sync.is_none());
    }
}
