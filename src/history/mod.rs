//! Sync run history tracking and persistence.
//!
//! Every sync pass that attempted at least one remote write is recorded with
//! its trigger and outcome. The history keeps a rolling window of recent runs.

mod record;
mod storage;

pub use record::{SyncReport, SyncRunRecord, SyncTrigger};
pub use storage::SyncHistory;
