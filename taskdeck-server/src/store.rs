//! Task storage: the [`TaskStore`] trait and its in-memory implementation.
//!
//! Every mutation is scoped by `(id, owner)`: a task owned by someone else
//! is indistinguishable from a task that does not exist. The store assigns
//! ids and maintains `created_at` / `updated_at`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use taskdeck_proto::query::SortKey;
use taskdeck_proto::task::{NewTask, OwnerId, Priority, Task, TaskId, TaskPatch};
use tokio::sync::RwLock;

use crate::query;

/// Errors reported by a [`TaskStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No task with this id belongs to this owner.
    #[error("task not found")]
    NotFound,
    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Equality predicate over an owner's tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPredicate {
    pub owner: OwnerId,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

impl TaskPredicate {
    /// Every task of `owner`.
    #[must_use]
    pub const fn owner(owner: OwnerId) -> Self {
        Self {
            owner,
            completed: None,
            priority: None,
        }
    }

    /// Whether `task` satisfies this predicate.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        task.owner == self.owner
            && self.completed.is_none_or(|c| c == task.completed)
            && self.priority.is_none_or(|p| p == task.priority)
    }
}

/// The storage collaborator the query engine runs against.
///
/// Reads are independent: two calls see whatever state the store is in at
/// the time of each call. There are no multi-call transactions.
pub trait TaskStore: Send + Sync {
    /// Matching tasks ordered by `sort`, skipping `offset` and returning at
    /// most `limit`.
    fn find(
        &self,
        predicate: &TaskPredicate,
        sort: SortKey,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Number of matching tasks.
    fn count(
        &self,
        predicate: &TaskPredicate,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// A single task by `(id, owner)`.
    fn get(
        &self,
        id: &TaskId,
        owner: &OwnerId,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Persist a new task for `owner`, assigning its id and timestamps.
    fn insert(
        &self,
        owner: &OwnerId,
        draft: NewTask,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Apply `patch` to the task `(id, owner)` and bump `updated_at`.
    fn update_by_id(
        &self,
        id: &TaskId,
        owner: &OwnerId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Remove the task `(id, owner)` permanently.
    fn delete_by_id(
        &self,
        id: &TaskId,
        owner: &OwnerId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Default)]
struct Inner {
    /// Owner -> (Task ID -> Task).
    tasks: HashMap<OwnerId, HashMap<TaskId, Task>>,
    /// Last timestamp handed out; stamps are strictly increasing.
    last_stamp: Option<DateTime<Utc>>,
}

impl Inner {
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// In-memory task store.
///
/// Thread-safe via [`RwLock`]. Tasks are partitioned by owner, so an
/// owner-scoped lookup never even sees another owner's records.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`]
    /// (or succeed again with `false`). Used to exercise failure paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

impl TaskStore for MemoryStore {
    async fn find(
        &self,
        predicate: &TaskPredicate,
        sort: SortKey,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Task>, StoreError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let Some(owned) = inner.tasks.get(&predicate.owner) else {
            return Ok(Vec::new());
        };
        let mut matching: Vec<&Task> = owned.values().filter(|t| predicate.matches(t)).collect();
        matching.sort_by(|a, b| query::compare(sort, a, b));
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, predicate: &TaskPredicate) -> Result<u64, StoreError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let count = inner.tasks.get(&predicate.owner).map_or(0, |owned| {
            owned.values().filter(|t| predicate.matches(t)).count()
        });
        Ok(count as u64)
    }

    async fn get(&self, id: &TaskId, owner: &OwnerId) -> Result<Task, StoreError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        inner
            .tasks
            .get(owner)
            .and_then(|owned| owned.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, owner: &OwnerId, draft: NewTask) -> Result<Task, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        let stamp = inner.next_stamp();
        let task = Task {
            id: TaskId::new(),
            owner: owner.clone(),
            title: draft.title,
            description: draft.description,
            completed: false,
            priority: draft.priority,
            due_date: draft.due_date,
            created_at: stamp,
            updated_at: stamp,
        };
        inner
            .tasks
            .entry(owner.clone())
            .or_default()
            .insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn update_by_id(
        &self,
        id: &TaskId,
        owner: &OwnerId,
        patch: &TaskPatch,
    ) -> Result<Task, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        let stamp = inner.next_stamp();
        let task = inner
            .tasks
            .get_mut(owner)
            .and_then(|owned| owned.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        patch.apply_to(task);
        task.updated_at = stamp;
        Ok(task.clone())
    }

    async fn delete_by_id(&self, id: &TaskId, owner: &OwnerId) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        inner
            .tasks
            .get_mut(owner)
            .and_then(|owned| owned.remove(id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
