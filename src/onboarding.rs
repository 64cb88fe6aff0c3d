use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{Confirm, Select, Text};

use crate::settings::{RemoteKind, SyncSettings};

/// Remote choice shown during onboarding
#[derive(Debug, Clone, Copy)]
enum RemoteChoice {
    Simulated,
    Http,
}

impl std::fmt::Display for RemoteChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteChoice::Simulated => write!(f, "Simulated backend (local testing, no network)"),
            RemoteChoice::Http => write!(f, "HTTP backend (REST endpoint per table)"),
        }
    }
}

/// Run the interactive onboarding flow, starting from `current`
pub fn run_onboarding(current: &SyncSettings) -> Result<SyncSettings> {
    println!(
        "\n{}",
        "⚙️  First time setup detected. Let's configure vitality-sync!"
            .cyan()
            .bold()
    );
    println!();

    let mut settings = current.clone();

    let choice = Select::new(
        "Where should queued operations be written?",
        vec![RemoteChoice::Simulated, RemoteChoice::Http],
    )
    .prompt()
    .context("Failed to get remote type")?;

    match choice {
        RemoteChoice::Simulated => {
            settings.remote = RemoteKind::Simulated;
        }
        RemoteChoice::Http => {
            let endpoint = Text::new("Enter the backend base URL:")
                .with_placeholder("https://api.example.com/rest/v1")
                .with_help_message("Operations are sent to <url>/<table>")
                .prompt()
                .context("Failed to get backend URL")?;

            if !is_valid_endpoint(&endpoint) {
                return Err(anyhow::anyhow!(
                    "Invalid endpoint. Must start with 'https://' or 'http://'"
                ));
            }

            let token = Text::new("Bearer token (leave empty for none):")
                .prompt()
                .context("Failed to get token")?;

            settings.remote = RemoteKind::Http;
            settings.remote_endpoint = Some(endpoint.trim_end_matches('/').to_string());
            settings.remote_token = Some(token.trim().to_string()).filter(|t| !t.is_empty());
        }
    }

    println!();

    let goal = Text::new("Daily hydration goal (liters):")
        .with_default(&settings.hydration_goal_liters.to_string())
        .prompt()
        .context("Failed to get hydration goal")?;
    settings.hydration_goal_liters = goal
        .trim()
        .parse::<f64>()
        .context("Invalid number of liters")?;

    let custom_interval = Confirm::new("Change how often the background flusher runs?")
        .with_default(false)
        .with_help_message(&format!(
            "Currently every {} seconds while `vitality-sync watch` runs",
            settings.flush_interval_secs
        ))
        .prompt()
        .context("Failed to get flush preference")?;

    if custom_interval {
        let secs = Text::new("Flush interval (seconds):")
            .with_default(&settings.flush_interval_secs.to_string())
            .prompt()
            .context("Failed to get flush interval")?;
        settings.flush_interval_secs = secs.trim().parse::<u64>().context("Invalid number of seconds")?;
    }

    settings.validate()?;

    println!();
    println!("{}", "✓ Configuration complete!".green().bold());

    Ok(settings)
}

/// Validate endpoint URL format
fn is_valid_endpoint(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}
