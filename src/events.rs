//! Offline analytics events emitted by the sync driver.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::queue::OperationType;

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEventKind {
    AppOffline,
    AppOnline,
    SyncStarted {
        #[serde(rename = "operationCount")]
        operation_count: usize,
    },
    SyncCompleted {
        #[serde(rename = "successCount")]
        success_count: usize,
        #[serde(rename = "failureCount")]
        failure_count: usize,
    },
    OperationQueued {
        #[serde(rename = "type")]
        op_type: OperationType,
        table: String,
    },
}

/// An analytics event with its emission time (epoch milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    #[serde(flatten)]
    pub kind: SyncEventKind,
    pub timestamp: i64,
}

impl SyncEvent {
    pub fn now(kind: SyncEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            SyncEventKind::AppOffline => "app_offline",
            SyncEventKind::AppOnline => "app_online",
            SyncEventKind::SyncStarted { .. } => "sync_started",
            SyncEventKind::SyncCompleted { .. } => "sync_completed",
            SyncEventKind::OperationQueued { .. } => "operation_queued",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"event\":\"{}\"}}", self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = SyncEvent::now(SyncEventKind::SyncCompleted {
            success_count: 2,
            failure_count: 1,
        });
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();

        assert_eq!(value["event"], "sync_completed");
        assert_eq!(value["successCount"], 2);
        assert_eq!(value["failureCount"], 1);
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_operation_queued_shape() {
        let event = SyncEvent::now(SyncEventKind::OperationQueued {
            op_type: OperationType::Update,
            table: "meals".to_string(),
        });
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();

        assert_eq!(value["event"], "operation_queued");
        assert_eq!(value["type"], "update");
        assert_eq!(value["table"], "meals");
        assert_eq!(event.name(), "operation_queued");
    }

    #[test]
    fn test_unit_events() {
        let event = SyncEvent::now(SyncEventKind::AppOffline);
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(value["event"], "app_offline");
    }
}
