//! Result assembler: executes a [`QueryPlan`] and builds a [`TaskPage`].
//!
//! The total and the rows come from two independent store reads (count,
//! then fetch). A write landing between them can leave `total` off by the
//! number of interleaved writes; the next list request corrects it.

use taskdeck_proto::query::{Pagination, TaskPage};

use crate::query::QueryPlan;
use crate::store::{StoreError, TaskStore};

/// Run `plan` against `store`.
///
/// An empty result is a normal page with no rows, never an error.
///
/// # Errors
///
/// Propagates [`StoreError`] from either read.
pub async fn assemble<S: TaskStore>(store: &S, plan: &QueryPlan) -> Result<TaskPage, StoreError> {
    let total = store.count(&plan.predicate).await?;
    let tasks = store
        .find(
            &plan.predicate,
            plan.sort,
            plan.offset,
            plan.limit as usize,
        )
        .await?;

    tracing::debug!(
        owner = %plan.predicate.owner,
        sort = %plan.sort,
        page = plan.page,
        limit = plan.limit,
        total,
        returned = tasks.len(),
        "assembled task page"
    );

    Ok(TaskPage {
        tasks,
        pagination: Pagination::new(plan.page, plan.limit, total),
    })
}
