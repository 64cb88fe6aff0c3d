//! Sync queue command handlers
//!
//! Queueing raw operations, connectivity changes, manual and scheduled sync
//! passes, and housekeeping of the persisted queue.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use inquire::Confirm;
use std::time::Duration;

use super::session::Session;
use crate::history::SyncReport;
use crate::queue::{OperationStatus, OperationType, SyncOperation, SyncScheduler};

fn print_report(report: &SyncReport) {
    if report.is_empty() {
        println!("{}", "Nothing to sync.".dimmed());
        return;
    }

    println!(
        "{} {} synced, {} will be retried, {} failed",
        "✓".green(),
        report.synced.to_string().green(),
        report.retried.to_string().yellow(),
        report.failed.to_string().red()
    );
}

/// Queue a raw operation for `table`
pub fn handle_queue(op_type: OperationType, table: &str, data: &str) -> Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(data).context("Operation data must be valid JSON")?;

    let session = Session::open()?;
    let id = {
        let mut service = session.lock()?;
        let id = service.queue_operation(op_type, table, payload)?;
        let still_pending = service.pending_operations().iter().any(|op| op.id == id);
        if still_pending {
            println!("{} Queued {} on {} ({})", "✓".green(), op_type, table.bold(), id.dimmed());
        } else {
            println!("{} Synced {} on {} ({})", "✓".green(), op_type, table.bold(), id.dimmed());
        }
        id
    };
    log::debug!("Operation {id} handled");

    session.finish()
}

/// Run a sync pass now
pub fn handle_sync() -> Result<()> {
    let session = Session::open()?;
    {
        let mut service = session.lock()?;
        if !service.is_online() {
            println!(
                "{} Offline: {} operations stay queued. Run {} first.",
                "!".yellow(),
                service.pending_operations().len(),
                "vitality-sync online".cyan()
            );
        } else {
            println!("{}", format!("Syncing through {} remote...", service.remote_name()).cyan());
            let report = service.force_sync()?;
            print_report(&report);
        }
    }
    session.finish()
}

/// Switch connectivity; going online syncs pending operations
pub fn handle_connectivity(online: bool) -> Result<()> {
    let session = Session::open()?;
    {
        let mut service = session.lock()?;
        let was_online = service.is_online();
        let report = service.set_online(online)?;

        match (online, was_online) {
            (true, true) => println!("{}", "Already online.".dimmed()),
            (false, false) => println!("{}", "Already offline.".dimmed()),
            (true, false) => {
                println!("{}", "✓ Online".green().bold());
                if let Some(report) = report {
                    print_report(&report);
                }
            }
            (false, true) => println!(
                "{} Offline. New operations will be queued locally.",
                "✓".yellow().bold()
            ),
        }
    }
    session.finish()
}

/// Show connectivity and queue counts
pub fn handle_status(show_pending: bool) -> Result<()> {
    let session = Session::open()?;
    {
        let service = session.lock()?;
        let status = service.sync_status()?;

        println!("{}", "Sync Status".cyan().bold());
        println!("{}", "=".repeat(40).cyan());
        println!(
            "  {} {}",
            "Connection:".bold(),
            if status.is_online {
                "online".green()
            } else {
                "offline".yellow()
            }
        );
        println!("  {} {}", "Remote:".bold(), service.remote_name());
        println!("  {} {}", "Pending:".bold(), status.pending_operations);
        println!(
            "  {} {}",
            "Failed:".bold(),
            if status.failed_operations > 0 {
                status.failed_operations.to_string().red()
            } else {
                "0".normal()
            }
        );
        match session.state.last_sync {
            Some(at) => println!(
                "  {} {}",
                "Last sync:".bold(),
                at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => println!("  {} {}", "Last sync:".bold(), "never".dimmed()),
        }

        if show_pending {
            print_operations("Pending operations", service.pending_operations());
        }
        let failed = service.failed_operations()?;
        if !failed.is_empty() {
            print_operations("Failed operations", &failed);
            println!(
                "\n{} Requeue one with {}",
                "Tip:".cyan(),
                "vitality-sync retry <id>".bold()
            );
        }
    }
    session.finish()
}

fn print_operations(title: &str, operations: &[SyncOperation]) {
    println!("\n{}", title.bold());
    if operations.is_empty() {
        println!("  {}", "none".dimmed());
        return;
    }

    for op in operations {
        let status = match op.status {
            OperationStatus::Pending => op.status.as_str().yellow(),
            OperationStatus::Synced => op.status.as_str().green(),
            OperationStatus::Failed => op.status.as_str().red(),
        };
        println!(
            "  {} {} {}",
            op.id.dimmed(),
            status,
            op.summary()
        );
    }
}

/// Keep flushing the queue in the background until `cycles` passes have run
///
/// With no cycle limit this runs until the process is interrupted.
pub fn handle_watch(interval_secs: Option<u64>, cycles: Option<u32>) -> Result<()> {
    let mut session = Session::open()?;
    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| session.settings.flush_interval());
    if interval.is_zero() {
        bail!("Flush interval must be at least one second");
    }

    {
        let mut service = session.lock()?;
        if !service.is_online() {
            println!("{}", "Going online for watch mode".cyan());
            service.set_online(true)?;
        }
    }
    session.save_online()?;

    println!(
        "{} every {}s{}",
        "Flushing sync queue".cyan().bold(),
        interval.as_secs(),
        cycles
            .map(|n| format!(" for {n} cycles"))
            .unwrap_or_else(|| " (Ctrl+C to stop)".to_string())
    );

    let scheduler = SyncScheduler::start(session.shared(), interval)?;
    match cycles {
        Some(n) => std::thread::sleep(interval * n + interval / 2),
        None => loop {
            std::thread::sleep(interval);
            let service = session.lock()?;
            log::info!("{} operations pending", service.pending_operations().len());
        },
    }
    scheduler.stop();

    {
        let service = session.lock()?;
        let status = service.sync_status()?;
        println!(
            "{} {} pending, {} failed",
            "Stopped.".green(),
            status.pending_operations,
            status.failed_operations
        );
    }
    session.finish()
}

/// Give a failed operation a fresh retry budget
pub fn handle_retry(id: &str) -> Result<()> {
    let session = Session::open()?;
    {
        let mut service = session.lock()?;
        if !service.retry_failed(id)? {
            bail!("No failed operation with id {id}");
        }
        println!("{} Requeued {}", "✓".green(), id);
    }
    session.finish()
}

/// Remove synced operations from disk
pub fn handle_prune() -> Result<()> {
    let session = Session::open()?;
    {
        let mut service = session.lock()?;
        let removed = service.prune_synced()?;
        if removed > 0 {
            println!("{} Pruned {} synced operations", "✓".green(), removed);
        } else {
            println!("{}", "No synced operations to prune".dimmed());
        }
    }
    session.finish()
}

/// Wipe every local partition
pub fn handle_clear(yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new("Delete all local data, including unsynced operations?")
            .with_default(false)
            .prompt()
            .context("Failed to get confirmation")?;
        if !confirmed {
            println!("{}", "Clear cancelled.".yellow());
            return Ok(());
        }
    }

    let session = Session::open()?;
    {
        let mut service = session.lock()?;
        service.clear_all_data()?;
    }
    println!("{}", "✓ All local data cleared".green().bold());
    session.finish()
}
