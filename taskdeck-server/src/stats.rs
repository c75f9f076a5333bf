//! Aggregation engine: counters over an owner's entire task set.
//!
//! Counts are recomputed from a single read on every call, ignoring any
//! list filter. A snapshot therefore always satisfies both partition
//! invariants for the state the store was in at that read.

use taskdeck_proto::query::SortKey;
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::OwnerId;

use crate::store::{StoreError, TaskPredicate, TaskStore};

/// Compute the stats snapshot for `owner`.
///
/// # Errors
///
/// Propagates [`StoreError`] from the underlying read.
pub async fn aggregate<S: TaskStore>(store: &S, owner: &OwnerId) -> Result<StatsSnapshot, StoreError> {
    let predicate = TaskPredicate::owner(owner.clone());
    let tasks = store
        .find(&predicate, SortKey::CreatedAt, 0, usize::MAX)
        .await?;
    let stats = StatsSnapshot::tally(&tasks);
    debug_assert!(stats.is_consistent());
    tracing::debug!(owner = %owner, total = stats.total, "aggregated task stats");
    Ok(stats)
}
