use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable that overrides the configuration directory
pub const HOME_ENV_VAR: &str = "VITALITY_SYNC_HOME";

const APP_DIR_NAME: &str = "vitality-sync";

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - `$VITALITY_SYNC_HOME` when set (any platform)
    /// - Linux: $XDG_CONFIG_HOME/vitality-sync or ~/.config/vitality-sync
    /// - macOS: ~/Library/Application Support/vitality-sync
    /// - Windows: %APPDATA%\vitality-sync
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(home) = std::env::var(HOME_ENV_VAR) {
            if !home.trim().is_empty() {
                return Ok(PathBuf::from(home));
            }
        }

        #[cfg(target_os = "linux")]
        {
            // Follow XDG Base Directory Specification
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join(APP_DIR_NAME))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join(APP_DIR_NAME))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home
                .join("Library")
                .join("Application Support")
                .join(APP_DIR_NAME))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join(APP_DIR_NAME))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(".vitality-sync"))
        }
    }

    /// Get the connectivity state file path (state.json)
    pub fn state_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("state.json"))
    }

    /// Get the settings file path (config.toml)
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the sync run history file path
    pub fn sync_history_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("sync-history.json"))
    }

    /// Get the local store directory (one JSON document per partition)
    pub fn store_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("store"))
    }

    /// Get the log file path
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("vitality-sync.log"))
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;
        Ok(config_dir)
    }

    /// Ensure the local store directory exists
    pub fn ensure_store_dir() -> Result<PathBuf> {
        let store_dir = Self::store_dir()?;
        std::fs::create_dir_all(&store_dir).with_context(|| {
            format!("Failed to create store directory: {}", store_dir.display())
        })?;
        Ok(store_dir)
    }
}
