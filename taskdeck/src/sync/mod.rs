//! Client cache synchronization.

pub mod cache;
pub mod synchronizer;

pub use cache::{ListOutcome, SyncState, TaskCache};
pub use synchronizer::{CacheSnapshot, SyncError, Synchronizer};
