use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What caused a sync pass to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    /// A new operation was queued while online
    Queued,
    /// Connectivity came back
    Reconnect,
    /// A session opened while the app was left online
    Resume,
    /// The background flusher ticked
    Scheduled,
    /// Requested explicitly (`vitality-sync sync`)
    Manual,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &str {
        match self {
            SyncTrigger::Queued => "queued",
            SyncTrigger::Reconnect => "reconnect",
            SyncTrigger::Resume => "resume",
            SyncTrigger::Scheduled => "scheduled",
            SyncTrigger::Manual => "manual",
        }
    }
}

/// Outcome of a single sync pass over the pending queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Remote write attempts made
    pub attempted: usize,
    /// Operations written successfully
    pub synced: usize,
    /// Operations that failed but stay pending
    pub retried: usize,
    /// Operations that exhausted their retries in this pass
    pub failed: usize,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }

    /// Failed attempts in this pass, whether or not they will be retried
    pub fn failure_count(&self) -> usize {
        self.retried + self.failed
    }
}

/// Record of a completed sync pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRunRecord {
    pub trigger: SyncTrigger,

    /// When the pass finished
    pub timestamp: DateTime<Utc>,

    pub report: SyncReport,

    /// Pending operations left after the pass
    pub remaining: usize,
}

impl SyncRunRecord {
    pub fn new(trigger: SyncTrigger, report: SyncReport, remaining: usize) -> Self {
        Self {
            trigger,
            timestamp: Utc::now(),
            report,
            remaining,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} sync at {}: {} attempted, {} synced, {} retrying, {} failed ({} still pending)",
            self.trigger.as_str(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.report.attempted,
            self.report.synced,
            self.report.retried,
            self.report.failed,
            self.remaining
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let report = SyncReport {
            attempted: 4,
            synced: 2,
            retried: 1,
            failed: 1,
        };
        assert!(!report.is_empty());
        assert_eq!(report.failure_count(), 2);
        assert!(SyncReport::default().is_empty());
    }

    #[test]
    fn test_run_record_summary() {
        let record = SyncRunRecord::new(
            SyncTrigger::Reconnect,
            SyncReport {
                attempted: 3,
                synced: 3,
                ..Default::default()
            },
            0,
        );

        let summary = record.summary();
        assert!(summary.starts_with("reconnect sync"));
        assert!(summary.contains("3 attempted, 3 synced"));
        assert!(summary.contains("(0 still pending)"));
    }

    #[test]
    fn test_trigger_serde() {
        let json = serde_json::to_string(&SyncTrigger::Scheduled).unwrap();
        assert_eq!(json, r#""scheduled""#);
    }
}
