// Module declarations
mod operation;
mod remote;
mod scheduler;
mod service;

// Re-export public types and functions
pub use operation::{OperationStatus, OperationType, SyncOperation};
pub use remote::{build_remote, HttpRemote, RemoteError, RemoteSink, SimulatedRemote};
pub use scheduler::SyncScheduler;
pub use service::{SharedSyncService, SyncService, SyncStatus};
