use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use vitality_sync::events::SyncEventKind;
use vitality_sync::history::{SyncHistory, SyncTrigger};
use vitality_sync::queue::{
    OperationStatus, OperationType, RemoteError, RemoteSink, SyncOperation, SyncScheduler,
    SyncService,
};
use vitality_sync::store::{LocalStore, Partition};
use vitality_sync::tracker::{DailyTracker, MealType, HYDRATION_TABLE, STATS_TABLE};

/// Remote that records every write and fails while `down` is set
#[derive(Clone, Default)]
struct RecordingRemote {
    writes: Arc<Mutex<Vec<(OperationType, String)>>>,
    down: Arc<Mutex<bool>>,
    failures: Arc<Mutex<VecDeque<()>>>,
}

impl RecordingRemote {
    fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }

    fn fail_next(&self, times: usize) {
        self.failures.lock().unwrap().extend(std::iter::repeat(()).take(times));
    }

    fn writes(&self) -> Vec<(OperationType, String)> {
        self.writes.lock().unwrap().clone()
    }
}

impl RemoteSink for RecordingRemote {
    fn apply(&mut self, op: &SyncOperation) -> Result<(), RemoteError> {
        if *self.down.lock().unwrap() || self.failures.lock().unwrap().pop_front().is_some() {
            return Err(RemoteError::Http {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((op.op_type, op.table.clone()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Test helper to create a service over a fresh store
fn create_service(remote: &RecordingRemote) -> (TempDir, SyncService) {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::open(dir.path().join("store")).unwrap();
    let mut service = SyncService::new(store, Box::new(remote.clone()), 3)
        .with_history(dir.path().join("sync-history.json"));
    service.initialize().unwrap();
    (dir, service)
}

fn reopen(dir: &TempDir, remote: &RecordingRemote) -> SyncService {
    let store = LocalStore::open(dir.path().join("store")).unwrap();
    let mut service = SyncService::new(store, Box::new(remote.clone()), 3)
        .with_history(dir.path().join("sync-history.json"));
    service.initialize().unwrap();
    service
}

#[test]
fn test_offline_session_survives_restart_and_syncs_on_reconnect() {
    let remote = RecordingRemote::default();
    let (dir, mut service) = create_service(&remote);

    let meal_id = {
        let mut tracker = DailyTracker::new(&mut service, 2.5);
        tracker.add_water(0.5).unwrap();
        tracker
            .log_meal("Avena con fruta", 350, MealType::Breakfast, "08:30")
            .unwrap()
            .id
    };
    assert!(remote.writes().is_empty());
    assert_eq!(service.pending_operations().len(), 3);
    drop(service);

    // A new process picks up where the last one left off
    let mut service = reopen(&dir, &remote);
    assert_eq!(service.pending_operations().len(), 3);
    assert_eq!(service.store().count(Partition::Meals).unwrap(), 1);

    let report = service.set_online(true).unwrap().unwrap();
    assert_eq!(report.synced, 3);
    assert!(service.pending_operations().is_empty());

    let writes = remote.writes();
    assert_eq!(
        writes,
        vec![
            (OperationType::Update, STATS_TABLE.to_string()),
            (OperationType::Create, HYDRATION_TABLE.to_string()),
            (OperationType::Create, "meals".to_string()),
        ]
    );

    // Online writes go straight through
    DailyTracker::new(&mut service, 2.5)
        .set_meal_completed(&meal_id, true)
        .unwrap();
    assert_eq!(remote.writes().len(), 4);
    assert!(service.pending_operations().is_empty());

    let history = SyncHistory::load_from(&dir.path().join("sync-history.json")).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.last_run().unwrap().trigger, SyncTrigger::Queued);
    assert_eq!(
        history
            .last_run_by_trigger(SyncTrigger::Reconnect)
            .unwrap()
            .report
            .synced,
        3
    );
}

#[test]
fn test_three_failures_mark_operation_failed_until_retried() {
    let remote = RecordingRemote::default();
    let (dir, mut service) = create_service(&remote);

    remote.set_down(true);
    service.set_online(true).unwrap();
    let id = service
        .queue_operation(OperationType::Create, "workouts", json!({"exerciseName": "Yoga"}))
        .unwrap();

    service.sync_pending_operations().unwrap();
    service.sync_pending_operations().unwrap();

    let stored: SyncOperation = service
        .store()
        .get_local(Partition::SyncQueue, &id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OperationStatus::Failed);
    assert_eq!(stored.retry_count, 3);
    assert!(service.pending_operations().is_empty());

    // Nothing retries a failed operation on its own, not even a restart
    remote.set_down(false);
    service.force_sync().unwrap();
    drop(service);
    let mut service = reopen(&dir, &remote);
    service.set_online(true).unwrap();
    assert!(remote.writes().is_empty());

    let status = service.sync_status().unwrap();
    assert_eq!(status.pending_operations, 0);
    assert_eq!(status.failed_operations, 1);

    assert!(service.retry_failed(&id).unwrap());
    assert_eq!(remote.writes().len(), 1);
    assert_eq!(service.sync_status().unwrap().failed_operations, 0);
    assert_eq!(service.prune_synced().unwrap(), 1);
}

#[test]
fn test_events_follow_connectivity_and_passes() {
    let remote = RecordingRemote::default();
    let (_dir, mut service) = create_service(&remote);

    service
        .queue_operation(OperationType::Delete, "meals", json!({"id": "m1"}))
        .unwrap();
    remote.fail_next(1);
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

    service.set_online(true).unwrap();
    let events = service.take_events();
    assert!(events.iter().any(|e| e.kind
        == SyncEventKind::SyncCompleted {
            success_count: 1,
            failure_count: 0
        }));
}

#[test]
fn test_scheduler_drains_queue_after_outage() {
    let remote = RecordingRemote::default();
    let (_dir, mut service) = create_service(&remote);

    remote.fail_next(1);
    service.set_online(true).unwrap();
    service
        .queue_operation(OperationType::Create, "hydration_logs", json!({"amountLiters": 0.25}))
        .unwrap();
    assert_eq!(service.pending_operations().len(), 1);

    let shared = service.into_shared();
    let scheduler = SyncScheduler::start(shared.clone(), Duration::from_millis(20)).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    scheduler.stop();

    let service = shared.lock().unwrap();
    assert!(service.pending_operations().is_empty());
    assert_eq!(remote.writes().len(), 1);
}

#[test]
fn test_scheduler_flushes_operations_queued_by_another_process() {
    let remote = RecordingRemote::default();
    let (dir, mut watcher) = create_service(&remote);
    watcher.set_online(true).unwrap();

    let shared = watcher.into_shared();
    let scheduler = SyncScheduler::start(shared.clone(), Duration::from_millis(20)).unwrap();

    // A separate offline command writing to the same store
    let mut command = reopen(&dir, &remote);
    let id = command
        .queue_operation(OperationType::Create, "meals", json!({"name": "Arepa"}))
        .unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let status = loop {
        let op: SyncOperation = command
            .store()
            .get_local(Partition::SyncQueue, &id)
            .unwrap()
            .unwrap();
        if op.status == OperationStatus::Synced || std::time::Instant::now() > deadline {
            break op.status;
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    scheduler.stop();

    assert_eq!(status, OperationStatus::Synced);
    assert_eq!(remote.writes(), vec![(OperationType::Create, "meals".to_string())]);
    assert!(shared.lock().unwrap().pending_operations().is_empty());
}

#[test]
fn test_clear_all_data_empties_every_partition() {
    let remote = RecordingRemote::default();
    let (_dir, mut service) = create_service(&remote);

    {
        let mut tracker = DailyTracker::new(&mut service, 2.0);
        tracker.add_water(1.0).unwrap();
        tracker.log_workout("Correr", 30, 280).unwrap();
        tracker.log_mind_minutes(10).unwrap();
    }
    assert!(!service.pending_operations().is_empty());

    service.clear_all_data().unwrap();

    for partition in Partition::ALL {
        assert_eq!(service.store().count(partition).unwrap(), 0, "{partition}");
    }
    assert!(service.pending_operations().is_empty());
}
