//! Query compiler: turns a [`FilterSpec`] into a deterministic [`QueryPlan`].
//!
//! Compilation is pure. It validates pagination, clamps the page size and
//! fixes the comparator. Every comparator is a total order ending in `id`
//! ascending, so equal sort values never reorder between requests.

use std::cmp::Ordering;

use taskdeck_proto::error::ValidationError;
use taskdeck_proto::query::{FilterSpec, SortKey};
use taskdeck_proto::task::{OwnerId, Task};

use crate::store::TaskPredicate;

/// A validated, executable list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Owner scope plus the optional equality filters.
    pub predicate: TaskPredicate,
    pub sort: SortKey,
    /// 1-based page number, echoed in the pagination metadata.
    pub page: u32,
    /// Zero-based row offset, `(page - 1) * limit`.
    pub offset: usize,
    /// Page size after clamping to `[1, max_page_size]`.
    pub limit: u32,
}

/// Compile `spec` for `owner`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidPagination`] when `spec.page` is zero.
pub fn compile(
    spec: &FilterSpec,
    owner: OwnerId,
    max_page_size: u32,
) -> Result<QueryPlan, ValidationError> {
    if spec.page < 1 {
        return Err(ValidationError::InvalidPagination(format!(
            "page must be at least 1, got {}",
            spec.page
        )));
    }
    let limit = spec.limit.clamp(1, max_page_size.max(1));
    let offset = u64::from(spec.page - 1) * u64::from(limit);

    Ok(QueryPlan {
        predicate: TaskPredicate {
            owner,
            completed: spec.completed.required(),
            priority: spec.priority.required(),
        },
        sort: spec.sort,
        page: spec.page,
        offset: usize::try_from(offset).unwrap_or(usize::MAX),
        limit,
    })
}

/// Total order over tasks for `sort`.
#[must_use]
pub fn compare(sort: SortKey, a: &Task, b: &Task) -> Ordering {
    let primary = match sort {
        SortKey::CreatedAt => Ordering::Equal,
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Priority => b.priority.rank().cmp(&a.priority.rank()),
    };
    primary
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
