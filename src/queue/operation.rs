use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of remote mutation an operation carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(OperationType::Create),
            "update" => Ok(OperationType::Update),
            "delete" => Ok(OperationType::Delete),
            other => bail!("Unknown operation type '{other}' (expected create, update or delete)"),
        }
    }
}

/// Lifecycle state of a queued operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Waiting for (another) remote write attempt
    Pending,
    /// Written to the remote; kept on disk, dropped from the pending queue
    Synced,
    /// Retry bound reached; never retried automatically
    Failed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Synced => "synced",
            OperationStatus::Failed => "failed",
        }
    }
}

/// A local mutation waiting to be persisted remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    pub id: String,

    #[serde(rename = "type")]
    pub op_type: OperationType,

    /// Remote table the mutation targets
    pub table: String,

    #[serde(rename = "data")]
    pub payload: Value,

    pub timestamp: DateTime<Utc>,

    pub status: OperationStatus,

    pub retry_count: u32,
}

impl SyncOperation {
    /// Create a pending operation with a fresh id
    ///
    /// # Errors
    /// Returns an error if `table` is empty
    pub fn new(op_type: OperationType, table: impl Into<String>, payload: Value) -> Result<Self> {
        let table = table.into();
        if table.trim().is_empty() {
            bail!("table cannot be empty");
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            op_type,
            table,
            payload,
            timestamp: Utc::now(),
            status: OperationStatus::Pending,
            retry_count: 0,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    pub fn mark_synced(&mut self) {
        self.status = OperationStatus::Synced;
    }

    /// Count one failed attempt; the operation fails once `max_retries` is reached
    ///
    /// Returns `true` if this attempt exhausted the retry budget.
    pub fn record_failure(&mut self, max_retries: u32) -> bool {
        self.retry_count += 1;
        if self.retry_count >= max_retries {
            self.status = OperationStatus::Failed;
            return true;
        }
        false
    }

    /// Put a failed operation back in the queue with a fresh retry budget
    pub fn reset(&mut self) {
        self.status = OperationStatus::Pending;
        self.retry_count = 0;
    }

    /// Id of the remote row this operation targets, if the payload carries one
    pub fn record_id(&self) -> Option<&str> {
        self.payload.get("id").and_then(Value::as_str)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} on {} ({}, {} retries)",
            self.id,
            self.op_type,
            self.table,
            self.status.as_str(),
            self.retry_count
        )
    }
}
