//! Persistent local key-value store.
//!
//! Records are grouped into named partitions (logical tables) and persisted
//! as one JSON document per partition inside the store directory.

mod local;
mod partition;

pub use local::LocalStore;
pub use partition::Partition;
