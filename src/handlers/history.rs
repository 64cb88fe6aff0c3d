//! History command handlers
//!
//! Handles viewing and clearing the record of sync passes.

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};

use crate::config::ConfigManager;
use crate::history::{SyncHistory, SyncRunRecord, SyncTrigger};

fn trigger_label(trigger: SyncTrigger) -> ColoredString {
    let label = trigger.as_str().to_uppercase();
    match trigger {
        SyncTrigger::Queued => label.blue(),
        SyncTrigger::Reconnect => label.green(),
        SyncTrigger::Resume => label.yellow(),
        SyncTrigger::Scheduled => label.cyan(),
        SyncTrigger::Manual => label.magenta(),
    }
}

fn print_run(run: &SyncRunRecord) {
    println!(
        "   {} {}",
        "Time:".dimmed(),
        run.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "   {} {} attempted, {} synced, {} retrying, {}",
        "Operations:".dimmed(),
        run.report.attempted,
        run.report.synced.to_string().green(),
        run.report.retried.to_string().yellow(),
        if run.report.failed > 0 {
            format!("{} failed", run.report.failed).red()
        } else {
            "0 failed".normal()
        }
    );
    println!("   {} {}", "Still pending:".dimmed(), run.remaining);
}

/// Handle history list command
pub fn handle_history_list(limit: usize) -> Result<()> {
    let history = SyncHistory::load().context("Failed to load sync history")?;

    if history.is_empty() {
        println!("{}", "No sync passes in history.".yellow());
        return Ok(());
    }

    println!("{}", "Sync History".cyan().bold());
    println!("{}", "=".repeat(80).cyan());

    let runs = history.list_runs();
    let display_count = runs.len().min(limit);

    for (idx, run) in runs.iter().take(display_count).enumerate() {
        let num = format!("{}.", idx + 1);
        println!("\n{} {}", num.bold(), trigger_label(run.trigger).bold());
        print_run(run);
    }

    if runs.len() > display_count {
        println!(
            "\n{} Showing {} of {} sync passes",
            "Note:".yellow(),
            display_count,
            runs.len()
        );
    }

    Ok(())
}

/// Handle history last command
pub fn handle_history_last(trigger: Option<&str>) -> Result<()> {
    let history = SyncHistory::load().context("Failed to load sync history")?;

    let run = if let Some(trigger) = trigger {
        let filter = match trigger.to_lowercase().as_str() {
            "queued" => SyncTrigger::Queued,
            "reconnect" => SyncTrigger::Reconnect,
            "resume" => SyncTrigger::Resume,
            "scheduled" => SyncTrigger::Scheduled,
            "manual" => SyncTrigger::Manual,
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid trigger '{trigger}'. Must be 'queued', 'reconnect', 'resume', 'scheduled' or 'manual'."
                ));
            }
        };

        history
            .last_run_by_trigger(filter)
            .ok_or_else(|| anyhow::anyhow!("No {} sync found in history.", filter.as_str()))?
    } else {
        history
            .last_run()
            .ok_or_else(|| anyhow::anyhow!("No sync passes in history."))?
    };

    println!("{}", "Last Sync Pass".cyan().bold());
    println!("{}", "=".repeat(80).cyan());
    println!("\n{} {}", "Trigger:".bold(), trigger_label(run.trigger).bold());
    print_run(run);

    Ok(())
}

/// Handle history clear command
pub fn handle_history_clear() -> Result<()> {
    let path = ConfigManager::sync_history_path()?;
    let mut history = SyncHistory::load_from(&path).context("Failed to load sync history")?;

    if history.is_empty() {
        println!("{}", "No history to clear.".yellow());
        return Ok(());
    }

    let count = history.len();
    history.clear();
    history.save_to(&path).context("Failed to clear history")?;

    println!(
        "{} Cleared {} sync pass(es) from history.",
        "SUCCESS:".green().bold(),
        count
    );

    Ok(())
}
