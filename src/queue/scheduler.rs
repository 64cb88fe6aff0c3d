use anyhow::{Context, Result};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::service::SharedSyncService;
use crate::history::SyncTrigger;

/// Background flusher that runs a sync pass every `interval`
///
/// Each tick takes the service lock, so scheduled passes never overlap with
/// foreground actions. The pending queue is re-read from the store first, so
/// operations queued by other processes are flushed too. Stopping prevents future ticks; a pass already in
/// progress runs to completion before the worker exits.
pub struct SyncScheduler {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn start(service: SharedSyncService, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("vitality-sync-flusher".to_string())
            .spawn(move || {
                log::debug!("Background flusher started ({}s interval)", interval.as_secs_f64());
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let mut service = match service.lock() {
                        Ok(guard) => guard,
                        Err(_) => {
                            log::error!("Sync service lock poisoned. Stopping background flusher.");
                            break;
                        }
                    };

                    if let Err(e) = service.reload_pending() {
                        log::warn!("Failed to reload sync queue: {e:#}");
                    }

                    match service.sync_with_trigger(SyncTrigger::Scheduled) {
                        Ok(report) if !report.is_empty() => log::debug!(
                            "Scheduled sync: {} synced, {} retrying, {} failed",
                            report.synced,
                            report.retried,
                            report.failed
                        ),
                        Ok(_) => {}
                        Err(e) => log::warn!("Scheduled sync failed: {e:#}"),
                    }
                }
                log::debug!("Background flusher stopped");
            })
            .context("Failed to spawn background flusher")?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop ticking and wait for the worker to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Background flusher panicked");
            }
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
