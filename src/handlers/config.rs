//! Configuration command handlers
//!
//! Handles the menu-based editing of `config.toml`.

use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{Confirm, MultiSelect, Select, Text};

use crate::settings::{RemoteKind, SyncSettings};

const MAX_RETRIES: &str = "Max retries";
const CACHE_TTL: &str = "Cache TTL (seconds)";
const FLUSH_INTERVAL: &str = "Flush interval (seconds)";
const HYDRATION_GOAL: &str = "Hydration goal (liters)";
const REMOTE: &str = "Remote backend";
const SIMULATED_LATENCY: &str = "Simulated latency (ms)";
const COACH_ENDPOINT: &str = "Coach endpoint";

fn prompt_number<T>(label: &str, current: T) -> Result<T>
where
    T: std::str::FromStr + std::fmt::Display,
{
    let input = Text::new(label)
        .with_default(&current.to_string())
        .prompt()?;

    input
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid number for {label}"))
}

/// Handle interactive configuration menu
///
/// Shows all configuration options and allows user to select which ones to modify
pub fn handle_config_interactive() -> Result<()> {
    println!("{}", "Interactive Configuration".cyan().bold());
    println!("{}", "=".repeat(80).cyan());
    println!();

    let current = SyncSettings::load().context("Failed to load current configuration")?;

    println!("{}", "Current Settings:".bold());
    display_config_summary(&current);
    println!();

    let options = vec![
        MAX_RETRIES,
        CACHE_TTL,
        FLUSH_INTERVAL,
        HYDRATION_GOAL,
        REMOTE,
        SIMULATED_LATENCY,
        COACH_ENDPOINT,
    ];

    let selections = MultiSelect::new(
        "Select settings to modify (Space to select, Enter to confirm):",
        options,
    )
    .with_help_message("Use arrow keys to navigate, Space to select/deselect, Enter when done")
    .prompt()
    .context("Failed to get user selections")?;

    if selections.is_empty() {
        println!("{}", "No settings selected. Configuration unchanged.".yellow());
        return Ok(());
    }

    println!();
    let mut modified = current.clone();

    for selection in selections {
        match selection {
            MAX_RETRIES => {
                modified.max_retries = prompt_number("Max retries:", modified.max_retries)?;
                println!("  {} Set max_retries to {}", "✓".green(), modified.max_retries);
            }
            CACHE_TTL => {
                modified.cache_ttl_secs = prompt_number("Cache TTL (seconds):", modified.cache_ttl_secs)?;
                println!("  {} Set cache_ttl_secs to {}", "✓".green(), modified.cache_ttl_secs);
            }
            FLUSH_INTERVAL => {
                modified.flush_interval_secs =
                    prompt_number("Flush interval (seconds):", modified.flush_interval_secs)?;
                println!(
                    "  {} Set flush_interval_secs to {}",
                    "✓".green(),
                    modified.flush_interval_secs
                );
            }
            HYDRATION_GOAL => {
                modified.hydration_goal_liters =
                    prompt_number("Hydration goal (liters):", modified.hydration_goal_liters)?;
                println!(
                    "  {} Set hydration_goal_liters to {}",
                    "✓".green(),
                    modified.hydration_goal_liters
                );
            }
            REMOTE => {
                let remote = Select::new("Remote backend:", vec!["simulated", "http"])
                    .prompt()?
                    .parse::<RemoteKind>()?;
                modified.remote = remote;

                if remote == RemoteKind::Http {
                    let endpoint = Text::new("Backend base URL:")
                        .with_default(modified.remote_endpoint.as_deref().unwrap_or(""))
                        .prompt()?;
                    modified.remote_endpoint =
                        Some(endpoint.trim().to_string()).filter(|e| !e.is_empty());
                }
                println!("  {} Set remote to {}", "✓".green(), remote.as_str());
            }
            SIMULATED_LATENCY => {
                modified.simulated_latency_ms =
                    prompt_number("Simulated latency (ms):", modified.simulated_latency_ms)?;
                println!(
                    "  {} Set simulated_latency_ms to {}",
                    "✓".green(),
                    modified.simulated_latency_ms
                );
            }
            COACH_ENDPOINT => {
                let input = Text::new("Coach endpoint:")
                    .with_help_message("Leave empty to use the default generative-language endpoint")
                    .prompt()?;
                modified.coach_endpoint = Some(input.trim().to_string()).filter(|e| !e.is_empty());
                println!("  {} Set coach_endpoint", "✓".green());
            }
            _ => {}
        }
    }

    println!();
    println!("{}", "New Configuration:".cyan().bold());
    display_config_summary(&modified);
    println!();

    modified.validate()?;

    let confirm = Confirm::new("Save this configuration?")
        .with_default(true)
        .prompt()?;

    if confirm {
        modified.save().context("Failed to save configuration")?;
        println!("\n{} Configuration saved successfully!", "✓".green().bold());
    } else {
        println!("\n{}", "Configuration not saved.".yellow());
    }

    Ok(())
}

fn display_config_summary(settings: &SyncSettings) {
    println!("  {} {}", "Max retries:".dimmed(), settings.max_retries);
    println!("  {} {}s", "Cache TTL:".dimmed(), settings.cache_ttl_secs);
    println!("  {} {}s", "Flush interval:".dimmed(), settings.flush_interval_secs);
    println!("  {} {} L", "Hydration goal:".dimmed(), settings.hydration_goal_liters);
    match (&settings.remote, &settings.remote_endpoint) {
        (RemoteKind::Http, Some(endpoint)) => {
            println!("  {} http ({})", "Remote:".dimmed(), endpoint)
        }
        (remote, _) => println!("  {} {}", "Remote:".dimmed(), remote.as_str()),
    }
    println!("  {} {}ms", "Simulated latency:".dimmed(), settings.simulated_latency_ms);
}
