use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::operation::{OperationStatus, OperationType, SyncOperation};
use super::remote::RemoteSink;
use crate::events::{SyncEvent, SyncEventKind};
use crate::history::{SyncHistory, SyncReport, SyncRunRecord, SyncTrigger};
use crate::store::{LocalStore, Partition};

/// Sync service shared between foreground actions and the background flusher
pub type SharedSyncService = Arc<Mutex<SyncService>>;

/// Snapshot of the driver state shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_online: bool,
    pub pending_operations: usize,
    pub failed_operations: usize,
}

/// Offline-first sync driver
///
/// Mutations are persisted to the `syncQueue` partition before anything else
/// happens, then written to the remote whenever the service is online. Each
/// failed attempt bumps the operation's retry count; once it reaches
/// `max_retries` the operation is marked failed and leaves the pending queue.
/// Synced and failed operations stay on disk.
pub struct SyncService {
    store: LocalStore,
    remote: Box<dyn RemoteSink>,
    max_retries: u32,
    is_online: bool,
    queue: Vec<SyncOperation>,
    events: Vec<SyncEvent>,
    history_path: Option<PathBuf>,
}

impl SyncService {
    /// Create an offline service with an empty queue; call [`initialize`](Self::initialize)
    /// to load persisted pending operations
    pub fn new(store: LocalStore, remote: Box<dyn RemoteSink>, max_retries: u32) -> Self {
        Self {
            store,
            remote,
            max_retries: max_retries.max(1),
            is_online: false,
            queue: Vec::new(),
            events: Vec::new(),
            history_path: None,
        }
    }

    /// Record every non-empty sync pass in the history file at `path`
    pub fn with_history(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    pub fn into_shared(self) -> SharedSyncService {
        Arc::new(Mutex::new(self))
    }

    /// Load pending operations from the store, oldest first
    pub fn initialize(&mut self) -> Result<usize> {
        self.reload_pending()?;
        log::info!("Loaded {} pending sync operations", self.queue.len());
        Ok(self.queue.len())
    }

    /// Re-read the pending queue from the store
    ///
    /// Picks up operations queued by other processes sharing the store and
    /// drops ones they already synced. Returns how many operations are new
    /// to this service.
    pub fn reload_pending(&mut self) -> Result<usize> {
        let mut pending: Vec<SyncOperation> = self
            .store
            .get_all_local::<SyncOperation>(Partition::SyncQueue)
            .context("Failed to load sync queue")?
            .into_iter()
            .filter(SyncOperation::is_pending)
            .collect();
        pending.sort_by_key(|op| op.timestamp);

        let added = pending
            .iter()
            .filter(|op| !self.queue.iter().any(|known| known.id == op.id))
            .count();
        if added > 0 {
            log::debug!("Picked up {added} operations queued elsewhere");
        }

        self.queue = pending;
        Ok(added)
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn remote_name(&self) -> &str {
        self.remote.name()
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    /// Pending operations in queue order
    pub fn pending_operations(&self) -> &[SyncOperation] {
        &self.queue
    }

    /// Update connectivity; coming back online triggers a sync pass
    pub fn set_online(&mut self, online: bool) -> Result<Option<SyncReport>> {
        if online == self.is_online {
            return Ok(None);
        }
        self.is_online = online;

        if online {
            log::info!("Connection restored - starting sync");
            self.emit(SyncEventKind::AppOnline);
            self.sync_with_trigger(SyncTrigger::Reconnect).map(Some)
        } else {
            log::info!("Connection lost - switching to offline mode");
            self.emit(SyncEventKind::AppOffline);
            Ok(None)
        }
    }

    /// Resume a session that was left online without announcing a
    /// connectivity change, then sync whatever is pending
    pub fn restore_online(&mut self) -> Result<SyncReport> {
        self.is_online = true;
        self.sync_with_trigger(SyncTrigger::Resume)
    }

    /// Persist a new pending operation and append it to the queue
    ///
    /// When online, a sync pass runs immediately. A failing pass does not fail
    /// the enqueue: the operation is already persisted and will be retried.
    pub fn queue_operation(
        &mut self,
        op_type: OperationType,
        table: &str,
        payload: Value,
    ) -> Result<String> {
        let operation = SyncOperation::new(op_type, table, payload)?;
        let id = operation.id.clone();

        self.store
            .save_local(Partition::SyncQueue, &id, &operation)
            .with_context(|| format!("Failed to persist {op_type} operation for {table}"))?;
        self.queue.push(operation);

        log::debug!("Queued {op_type} operation {id} for {table}");
        self.emit(SyncEventKind::OperationQueued {
            op_type,
            table: table.to_string(),
        });

        if self.is_online {
            if let Err(e) = self.sync_with_trigger(SyncTrigger::Queued) {
                log::error!("Sync after queueing {id} failed: {e:#}");
            }
        }

        Ok(id)
    }

    /// Attempt every pending operation once
    pub fn sync_pending_operations(&mut self) -> Result<SyncReport> {
        self.sync_with_trigger(SyncTrigger::Scheduled)
    }

    /// Run a sync pass now, whatever triggered it before
    pub fn force_sync(&mut self) -> Result<SyncReport> {
        log::info!("Force syncing all pending operations");
        self.sync_with_trigger(SyncTrigger::Manual)
    }

    /// Attempt every pending operation once, recording `trigger` in the history
    ///
    /// Does nothing while offline or when the queue is empty. If an outcome
    /// cannot be persisted the pass stops there; the queue, events and history
    /// still reflect the operations already attempted before the error returns.
    pub fn sync_with_trigger(&mut self, trigger: SyncTrigger) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        if !self.is_online || self.queue.is_empty() {
            return Ok(report);
        }

        log::info!("Starting sync of {} pending operations", self.queue.len());
        self.emit(SyncEventKind::SyncStarted {
            operation_count: self.queue.len(),
        });

        let mut persist_error = None;
        for operation in self.queue.iter_mut().filter(|op| op.is_pending()) {
            report.attempted += 1;

            match self.remote.apply(operation) {
                Ok(()) => {
                    operation.mark_synced();
                    report.synced += 1;
                }
                Err(e) => {
                    let exhausted = operation.record_failure(self.max_retries);
                    log::warn!(
                        "Failed to sync operation {}, retry {}: {}",
                        operation.id,
                        operation.retry_count,
                        e
                    );
                    if exhausted {
                        log::error!(
                            "Operation {} marked failed after {} attempts",
                            operation.id,
                            operation.retry_count
                        );
                        report.failed += 1;
                    } else {
                        report.retried += 1;
                    }
                }
            }

            if let Err(e) = self
                .store
                .save_local(Partition::SyncQueue, &operation.id, &*operation)
                .with_context(|| format!("Failed to persist operation {}", operation.id))
            {
                persist_error = Some(e);
                break;
            }
        }

        self.queue.retain(SyncOperation::is_pending);

        self.emit(SyncEventKind::SyncCompleted {
            success_count: report.synced,
            failure_count: report.failure_count(),
        });
        self.record_run(trigger, report);

        match persist_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    fn record_run(&self, trigger: SyncTrigger, report: SyncReport) {
        let Some(path) = &self.history_path else {
            return;
        };
        if report.is_empty() {
            return;
        }

        let record = SyncRunRecord::new(trigger, report, self.queue.len());
        if let Err(e) = SyncHistory::append_to(path, record) {
            log::warn!("Failed to record sync run: {e:#}");
        }
    }

    /// Current connectivity plus pending and permanently failed counts
    pub fn sync_status(&self) -> Result<SyncStatus> {
        Ok(SyncStatus {
            is_online: self.is_online,
            pending_operations: self.queue.len(),
            failed_operations: self.failed_operations()?.len(),
        })
    }

    /// Every persisted operation that exhausted its retries
    pub fn failed_operations(&self) -> Result<Vec<SyncOperation>> {
        Ok(self
            .store
            .get_all_local::<SyncOperation>(Partition::SyncQueue)?
            .into_iter()
            .filter(|op| op.status == OperationStatus::Failed)
            .collect())
    }

    /// Put a failed operation back in the queue with a fresh retry budget
    ///
    /// Returns `false` if no failed operation has this id.
    pub fn retry_failed(&mut self, id: &str) -> Result<bool> {
        let Some(mut operation) = self
            .store
            .get_local::<SyncOperation>(Partition::SyncQueue, id)?
        else {
            return Ok(false);
        };
        if operation.status != OperationStatus::Failed {
            return Ok(false);
        }

        operation.reset();
        self.store
            .save_local(Partition::SyncQueue, id, &operation)
            .with_context(|| format!("Failed to requeue operation {id}"))?;
        self.queue.push(operation);
        log::info!("Requeued failed operation {id}");

        if self.is_online {
            self.sync_with_trigger(SyncTrigger::Manual)?;
        }
        Ok(true)
    }

    /// Drop synced operations from disk; returns how many were removed
    pub fn prune_synced(&mut self) -> Result<usize> {
        let synced: Vec<String> = self
            .store
            .get_all_local::<SyncOperation>(Partition::SyncQueue)?
            .into_iter()
            .filter(|op| op.status == OperationStatus::Synced)
            .map(|op| op.id)
            .collect();

        for id in &synced {
            self.store.delete_local(Partition::SyncQueue, id)?;
        }
        Ok(synced.len())
    }

    /// Wipe every partition and the in-memory queue
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.queue.clear();
        self.store.clear_all()
    }

    /// Drain the analytics events emitted since the last call
    pub fn take_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, kind: SyncEventKind) {
        let event = SyncEvent::now(kind);
        log::debug!("event {}", event.to_json());
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::remote::RemoteError;
    use serde_json::json;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    /// Remote that replays scripted outcomes and succeeds once they run out
    #[derive(Clone, Default)]
    struct ScriptedRemote {
        outcomes: Arc<Mutex<VecDeque<bool>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedRemote {
        fn failing(times: usize) -> Self {
            let remote = Self::default();
            remote.outcomes.lock().unwrap().extend(vec![false; times]);
            remote
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RemoteSink for ScriptedRemote {
        fn apply(&mut self, op: &SyncOperation) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(op.id.clone());
            match self.outcomes.lock().unwrap().pop_front() {
                Some(false) => Err(RemoteError::Transport("connection reset".to_string())),
                _ => Ok(()),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn service(remote: &ScriptedRemote) -> (TempDir, SyncService) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("store")).unwrap();
        let service = SyncService::new(store, Box::new(remote.clone()), 3)
            .with_history(dir.path().join("sync-history.json"));
        (dir, service)
    }

    fn stored(service: &SyncService, id: &str) -> SyncOperation {
        service
            .store()
            .get_local(Partition::SyncQueue, id)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_offline_queue_then_reconnect_writes_once() {
        let remote = ScriptedRemote::default();
        let (_dir, mut service) = service(&remote);

        let id = service
            .queue_operation(OperationType::Create, "meals", json!({"name": "Oats"}))
            .unwrap();
        assert!(remote.calls().is_empty());
        assert_eq!(service.pending_operations().len(), 1);

        let report = service.set_online(true).unwrap().unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.synced, 1);
        assert_eq!(remote.calls(), vec![id.clone()]);
        assert!(service.pending_operations().is_empty());
        assert_eq!(stored(&service, &id).status, OperationStatus::Synced);

        // Nothing left to write
        service.force_sync().unwrap();
        assert_eq!(remote.calls().len(), 1);
    }

    #[test]
    fn test_queue_while_online_syncs_immediately() {
        let remote = ScriptedRemote::default();
        let (_dir, mut service) = service(&remote);
        service.set_online(true).unwrap();

        let id = service
            .queue_operation(OperationType::Update, "userStats", json!({"calories": 1200}))
            .unwrap();

        assert_eq!(remote.calls(), vec![id]);
        assert_eq!(service.sync_status().unwrap().pending_operations, 0);
    }

    #[test]
    fn test_three_failures_mark_failed_and_stop_retrying() {
        let remote = ScriptedRemote::failing(10);
        let (_dir, mut service) = service(&remote);

        let id = service
            .queue_operation(OperationType::Create, "workouts", json!({}))
            .unwrap();
        service.set_online(true).unwrap();

        assert_eq!(stored(&service, &id).retry_count, 1);
        assert_eq!(stored(&service, &id).status, OperationStatus::Pending);

        service.force_sync().unwrap();
        assert_eq!(stored(&service, &id).retry_count, 2);
        assert_eq!(stored(&service, &id).status, OperationStatus::Pending);

        let report = service.force_sync().unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(stored(&service, &id).retry_count, 3);
        assert_eq!(stored(&service, &id).status, OperationStatus::Failed);

        // No further automatic attempts
        service.force_sync().unwrap();
        service.sync_pending_operations().unwrap();
        assert_eq!(remote.calls().len(), 3);

        let status = service.sync_status().unwrap();
        assert_eq!(status.pending_operations, 0);
        assert_eq!(status.failed_operations, 1);
    }

    #[test]
    fn test_failure_then_success() {
        let remote = ScriptedRemote::failing(1);
        let (_dir, mut service) = service(&remote);
        service.set_online(true).unwrap();

        let id = service
            .queue_operation(OperationType::Delete, "meals", json!({"id": "m-1"}))
            .unwrap();
        assert_eq!(service.pending_operations().len(), 1);

        let report = service.sync_pending_operations().unwrap();
        assert_eq!(report.synced, 1);
        let op = stored(&service, &id);
        assert_eq!(op.status, OperationStatus::Synced);
        assert_eq!(op.retry_count, 1);
    }

    #[test]
    fn test_offline_pass_is_noop() {
        let remote = ScriptedRemote::default();
        let (_dir, mut service) = service(&remote);
        service
            .queue_operation(OperationType::Create, "meals", json!({}))
            .unwrap();

        let report = service.force_sync().unwrap();
        assert!(report.is_empty());
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn test_initialize_loads_only_pending_in_order() {
        let remote = ScriptedRemote::default();
        let (dir, mut service) = service(&remote);

        let first = service
            .queue_operation(OperationType::Create, "meals", json!({"n": 1}))
            .unwrap();
        let second = service
            .queue_operation(OperationType::Create, "meals", json!({"n": 2}))
            .unwrap();

        let mut synced = stored(&service, &first);
        synced.mark_synced();
        service
            .store()
            .save_local(Partition::SyncQueue, &first, &synced)
            .unwrap();

        let store = LocalStore::open(dir.path().join("store")).unwrap();
        let mut reopened = SyncService::new(store, Box::new(remote.clone()), 3);
        assert_eq!(reopened.initialize().unwrap(), 1);
        assert_eq!(reopened.pending_operations()[0].id, second);
    }

    #[test]
    fn test_retry_failed_requeues() {
        let remote = ScriptedRemote::failing(3);
        let (_dir, mut service) = service(&remote);
        service.set_online(true).unwrap();

        let id = service
            .queue_operation(OperationType::Create, "meals", json!({}))
            .unwrap();
        service.force_sync().unwrap();
        service.force_sync().unwrap();
        assert_eq!(service.failed_operations().unwrap().len(), 1);

        assert!(service.retry_failed(&id).unwrap());
        assert_eq!(stored(&service, &id).status, OperationStatus::Synced);
        assert!(service.failed_operations().unwrap().is_empty());

        assert!(!service.retry_failed(&id).unwrap());
        assert!(!service.retry_failed("missing").unwrap());
    }

    #[test]
    fn test_events_and_history() {
        let remote = ScriptedRemote::default();
        let (dir, mut service) = service(&remote);

        service
            .queue_operation(OperationType::Create, "hydration_logs", json!({}))
            .unwrap();
        service.set_online(true).unwrap();
        service.set_online(false).unwrap();

        let names: Vec<&str> = service.take_events().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "operation_queued",
                "app_online",
                "sync_started",
                "sync_completed",
                "app_offline"
            ]
        );
        assert!(service.take_events().is_empty());

        let history = SyncHistory::load_from(&dir.path().join("sync-history.json")).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.last_run().unwrap().trigger, SyncTrigger::Reconnect);
    }

    /// Accepts every write, then swaps the store directory for a plain file
    /// so the next persist fails
    struct StoreBreakingRemote {
        store_root: PathBuf,
    }

    impl RemoteSink for StoreBreakingRemote {
        fn apply(&mut self, _op: &SyncOperation) -> Result<(), RemoteError> {
            if self.store_root.is_dir() {
                std::fs::remove_dir_all(&self.store_root).unwrap();
                std::fs::write(&self.store_root, b"").unwrap();
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "store-breaking"
        }
    }

    #[test]
    fn test_persist_failure_still_prunes_queue() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("store");
        let store = LocalStore::open(root.clone()).unwrap();
        let mut service = SyncService::new(
            store,
            Box::new(StoreBreakingRemote { store_root: root }),
            3,
        );
        service
            .queue_operation(OperationType::Create, "meals", json!({"n": 1}))
            .unwrap();
        service
            .queue_operation(OperationType::Create, "meals", json!({"n": 2}))
            .unwrap();
        service.take_events();

        assert!(service.set_online(true).is_err());

        assert_eq!(service.pending_operations().len(), 1);
        let names: Vec<&str> = service.take_events().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["app_online", "sync_started", "sync_completed"]);
    }

    #[test]
    fn test_restore_online_is_silent_but_syncs() {
        let remote = ScriptedRemote::default();
        let (dir, mut service) = service(&remote);
        service
            .queue_operation(OperationType::Create, "meals", json!({}))
            .unwrap();
        service.take_events();

        let report = service.restore_online().unwrap();
        assert_eq!(report.synced, 1);
        assert!(service.is_online());

        let names: Vec<&str> = service.take_events().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["sync_started", "sync_completed"]);
        let history = SyncHistory::load_from(&dir.path().join("sync-history.json")).unwrap();
        assert_eq!(history.last_run().unwrap().trigger, SyncTrigger::Resume);

        // Already online: nothing to announce on a later restore either
        service.restore_online().unwrap();
        assert!(service.take_events().is_empty());
    }

    #[test]
    fn test_reload_pending_sees_other_writers() {
        let remote = ScriptedRemote::default();
        let (dir, mut service) = service(&remote);
        let mine = service
            .queue_operation(OperationType::Create, "meals", json!({"n": 1}))
            .unwrap();

        let store = LocalStore::open(dir.path().join("store")).unwrap();
        let mut other = SyncService::new(store, Box::new(remote.clone()), 3);
        other.initialize().unwrap();
        let theirs = other
            .queue_operation(OperationType::Create, "workouts", json!({"n": 2}))
            .unwrap();
        other.set_online(true).unwrap();
        assert_eq!(remote.calls(), vec![mine.clone(), theirs.clone()]);

        assert_eq!(service.reload_pending().unwrap(), 0);
        assert!(service.pending_operations().is_empty());

        let fresh = other.store().clone();
        let mut writer = SyncService::new(fresh, Box::new(remote.clone()), 3);
        let late = writer
            .queue_operation(OperationType::Update, "meals", json!({"n": 3}))
            .unwrap();
        assert_eq!(service.reload_pending().unwrap(), 1);
        assert_eq!(service.pending_operations()[0].id, late);
    }

    #[test]
    fn test_prune_and_clear() {
        let remote = ScriptedRemote::default();
        let (_dir, mut service) = service(&remote);
        service.set_online(true).unwrap();
        service
            .queue_operation(OperationType::Create, "meals", json!({}))
            .unwrap();
        service.set_online(false).unwrap();
        service
            .queue_operation(OperationType::Create, "meals", json!({}))
            .unwrap();

        assert_eq!(service.prune_synced().unwrap(), 1);
        assert_eq!(service.store().count(Partition::SyncQueue).unwrap(), 1);

        service.clear_all_data().unwrap();
        assert!(service.pending_operations().is_empty());
        assert_eq!(service.store().count(Partition::SyncQueue).unwrap(), 0);
    }
}
