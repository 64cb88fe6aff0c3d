//! Onboarding and initialization handlers
//!
//! Handles the first-time setup flow including checking initialization
//! status and writing the initial settings, store and state.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::ConfigManager;
use crate::onboarding;
use crate::settings::{SettingsUpdate, SyncSettings};
use crate::state::AppState;

/// Check if vitality-sync has been initialized
pub fn is_initialized() -> Result<bool> {
    let settings_path = ConfigManager::settings_path()?;
    Ok(settings_path.exists())
}

/// Initialize settings, store and state
///
/// Runs the interactive onboarding when `interactive` is set and stdin is a
/// terminal; otherwise only the given overrides are applied to the defaults.
pub fn handle_init(update: SettingsUpdate, interactive: bool) -> Result<()> {
    let existing = is_initialized()?;
    let mut settings = SyncSettings::load().context("Failed to load existing settings")?;

    for change in update.apply(&mut settings) {
        println!("{}", change.green());
    }

    if interactive && atty::is(atty::Stream::Stdin) {
        settings = onboarding::run_onboarding(&settings).context("Onboarding cancelled or failed")?;
    }

    settings.save().context("Failed to save settings")?;

    let store_dir = ConfigManager::ensure_store_dir()?;
    let state_path = ConfigManager::state_file_path()?;
    if !state_path.exists() {
        AppState::default()
            .save_to(&state_path)
            .context("Failed to initialize app state")?;
    }

    if existing {
        println!("{}", "✓ Settings updated".green().bold());
    } else {
        println!("{}", "✓ vitality-sync initialized".green().bold());
    }
    println!("  {} {}", "Config:".dimmed(), ConfigManager::config_dir()?.display());
    println!("  {} {}", "Store:".dimmed(), store_dir.display());
    println!("  {} {}", "Remote:".dimmed(), settings.remote.as_str());
    println!();
    println!(
        "The app starts {}. Run {} to start syncing.",
        "offline".yellow(),
        "vitality-sync online".cyan()
    );

    Ok(())
}
