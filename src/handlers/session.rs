//! Per-invocation sync session
//!
//! Opens the store, settings and remote, restores the persisted connectivity
//! and hands out the sync driver. [`Session::finish`] writes the analytics
//! events to the log file and saves the connectivity state.

use anyhow::{anyhow, Context, Result};
use std::sync::MutexGuard;

use crate::config::ConfigManager;
use crate::events::{SyncEvent, SyncEventKind};
use crate::logger;
use crate::queue::{build_remote, SharedSyncService, SyncService};
use crate::settings::SyncSettings;
use crate::state::AppState;
use crate::store::LocalStore;

pub struct Session {
    pub settings: SyncSettings,
    pub state: AppState,
    service: SharedSyncService,
}

impl Session {
    /// Open a session; if the app was last left online, pending operations
    /// are synced right away
    pub fn open() -> Result<Self> {
        let settings = SyncSettings::load().context("Failed to load settings")?;
        settings.validate()?;
        let state = AppState::load()?;

        let store = LocalStore::open_default()?;
        let remote = build_remote(&settings)?;
        let mut service = SyncService::new(store, remote, settings.max_retries)
            .with_history(ConfigManager::sync_history_path()?);
        service.initialize()?;

        if state.online {
            service.restore_online()?;
        }

        Ok(Self {
            settings,
            state,
            service: service.into_shared(),
        })
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, SyncService>> {
        self.service
            .lock()
            .map_err(|_| anyhow!("Sync service lock was poisoned"))
    }

    /// Handle for the background flusher
    pub fn shared(&self) -> SharedSyncService {
        self.service.clone()
    }

    /// Save the current connectivity right away, for sessions that run
    /// until interrupted
    pub fn save_online(&mut self) -> Result<()> {
        let online = self.lock()?.is_online();
        self.state.online = online;
        self.state.save().context("Failed to save app state")
    }

    /// Log emitted events and persist connectivity
    pub fn finish(mut self) -> Result<()> {
        let (events, online) = {
            let mut service = self.lock()?;
            (service.take_events(), service.is_online())
        };
        record_events(&mut self.state, &events);

        self.state.online = online;
        self.state.save().context("Failed to save app state")?;
        Ok(())
    }
}

fn record_events(state: &mut AppState, events: &[SyncEvent]) {
    for event in events {
        if let SyncEventKind::SyncCompleted { success_count, .. } = event.kind {
            state.record_sync(success_count);
        }
        if let Err(e) = logger::log_event(event) {
            log::warn!("Failed to write event to log file: {e:#}");
        }
    }
}
