use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::config::ConfigManager;
use crate::events::SyncEvent;

/// Maximum log file size before rotation (10MB)
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Initialize the logging system
///
/// Console output goes to stderr through `env_logger`, filtered by
/// `RUST_LOG` (default `info`). Sync events and driver messages are also
/// appended to `<config dir>/vitality-sync.log`.
///
/// ```bash
/// # Show every retry and remote write on the console
/// RUST_LOG=debug vitality-sync sync
///
/// # Quiet console; the log file still records sync events
/// RUST_LOG=off vitality-sync watch
/// ```
pub fn init_logger() -> Result<()> {
    ConfigManager::ensure_config_dir()?;

    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok();

    log_to_file(&format!("vitality-sync {} started, console level {level:?}", env!("CARGO_PKG_VERSION")))
}

/// Append a line to the log file, rotating it first if it grew too large
pub fn log_to_file(message: &str) -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;
    rotate_if_larger(&log_path, MAX_LOG_SIZE)?;
    append_line(&log_path, message)
}

/// Record an analytics event as a JSON line
pub fn log_event(event: &SyncEvent) -> Result<()> {
    log_to_file(&format!("event {}", event.to_json()))
}

fn append_line(path: &Path, message: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    )?;
    Ok(())
}

/// Rotate the log file to `.log.old` once it exceeds 10MB
pub fn rotate_log_if_needed() -> Result<()> {
    rotate_if_larger(&ConfigManager::log_file_path()?, MAX_LOG_SIZE)
}

fn rotate_if_larger(log_path: &Path, limit: u64) -> Result<()> {
    let Ok(metadata) = std::fs::metadata(log_path) else {
        return Ok(());
    };
    if metadata.len() <= limit {
        return Ok(());
    }

    let old_log_path = log_path.with_extension("log.old");
    if old_log_path.exists() {
        std::fs::remove_file(&old_log_path)?;
    }
    std::fs::rename(log_path, &old_log_path)
        .with_context(|| format!("Failed to rotate {}", log_path.display()))?;

    log::info!("Log file rotated to {}", old_log_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HOME_ENV_VAR;
    use crate::events::SyncEventKind;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_events_are_logged_as_json_lines() -> Result<()> {
        let home = TempDir::new()?;
        std::env::set_var(HOME_ENV_VAR, home.path());

        log_event(&SyncEvent::now(SyncEventKind::SyncStarted { operation_count: 2 }))?;
        log_to_file("plain message")?;

        let contents = std::fs::read_to_string(ConfigManager::log_file_path()?)?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#"event {"event":"sync_started","operationCount":2"#));
        assert!(lines[1].ends_with("plain message"));

        std::env::remove_var(HOME_ENV_VAR);
        Ok(())
    }

    #[test]
    fn test_rotation_threshold() -> Result<()> {
        let dir = TempDir::new()?;
        let log_path = dir.path().join("vitality-sync.log");

        std::fs::write(&log_path, vec![b'a'; 64])?;
        rotate_if_larger(&log_path, 64)?;
        assert!(log_path.exists());

        std::fs::write(&log_path, vec![b'a'; 65])?;
        rotate_if_larger(&log_path, 64)?;
        assert!(!log_path.exists());
        assert!(log_path.with_extension("log.old").exists());

        rotate_if_larger(&log_path, 64)?;
        Ok(())
    }
}
