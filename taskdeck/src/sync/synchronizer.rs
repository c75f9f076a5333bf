//! Drives a [`TaskCache`] against a [`TaskApi`].
//!
//! The cache sits behind a `parking_lot::Mutex` that is only taken between
//! awaits, so any number of operations may be in flight at once. Each one
//! resolves independently and applies its own result by record id.

use parking_lot::Mutex;
use taskdeck_proto::error::ValidationError;
use taskdeck_proto::query::{FilterSpec, Pagination};
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::{NewTask, Task, TaskId, TaskPatch};

use super::cache::{ListOutcome, SyncState, TaskCache};
use crate::api::{ApiError, TaskApi};

/// Errors returned by [`Synchronizer`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Rejected locally before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The request itself failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Point-in-time copy of the cache for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub state: SyncState,
    pub filter: FilterSpec,
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
    pub stats: StatsSnapshot,
}

/// Keeps a cached page and stats in step with the server.
pub struct Synchronizer<A> {
    api: A,
    cache: Mutex<TaskCache>,
}

impl<A: TaskApi> Synchronizer<A> {
    /// An idle synchronizer that will list with `filter`.
    pub fn new(api: A, filter: FilterSpec) -> Self {
        Self {
            api,
            cache: Mutex::new(TaskCache::new(filter)),
        }
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Copy out the current cache contents.
    pub fn snapshot(&self) -> CacheSnapshot {
        let cache = self.cache.lock();
        CacheSnapshot {
            state: cache.state(),
            filter: *cache.filter(),
            tasks: cache.tasks().to_vec(),
            pagination: *cache.pagination(),
            stats: *cache.stats(),
        }
    }

    /// Re-run the List for the current filter.
    ///
    /// # Errors
    ///
    /// The List's [`ApiError`]. The cached page is kept either way.
    pub async fn refresh(&self) -> Result<ListOutcome, SyncError> {
        self.list(None).await
    }

    /// Switch to `filter` and List it.
    ///
    /// # Errors
    ///
    /// The List's [`ApiError`].
    pub async fn set_filter(&self, filter: FilterSpec) -> Result<ListOutcome, SyncError> {
        self.list(Some(filter)).await
    }

    /// Same filter, different page.
    ///
    /// # Errors
    ///
    /// The List's [`ApiError`].
    pub async fn go_to_page(&self, page: u32) -> Result<ListOutcome, SyncError> {
        let filter = self.cache.lock().filter().with_page(page);
        self.list(Some(filter)).await
    }

    async fn list(&self, filter: Option<FilterSpec>) -> Result<ListOutcome, SyncError> {
        let ticket = self.cache.lock().begin_list(filter);
        tracing::debug!(seq = ticket.seq, sort = %ticket.spec.sort, page = ticket.spec.page, "listing tasks");

        let result = self.api.list(ticket.spec).await;
        let failure = result.as_ref().err().cloned();
        let outcome = self.cache.lock().finish_list(ticket.seq, result);
        match failure {
            Some(err) => {
                tracing::warn!(seq = ticket.seq, error = %err, "list failed");
                Err(err.into())
            }
            None => Ok(outcome),
        }
    }

    /// Fetch and install a fresh stats snapshot.
    ///
    /// # Errors
    ///
    /// The stats request's [`ApiError`]; the cached snapshot is unchanged.
    pub async fn refresh_stats(&self) -> Result<StatsSnapshot, SyncError> {
        let seq = self.cache.lock().begin_stats();
        let fetched = self.api.stats().await?;
        let mut cache = self.cache.lock();
        cache.finish_stats(seq, fetched);
        Ok(*cache.stats())
    }

    /// Reconcile stats after a mutation; failures are logged, not returned.
    async fn reconcile_stats(&self) {
        if let Err(e) = self.refresh_stats().await {
            tracing::warn!(error = %e, "stats refresh after mutation failed");
        }
    }

    /// Create a task.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`] for a bad title or description (nothing is
    /// sent), otherwise the create's [`ApiError`].
    pub async fn create(&self, draft: NewTask) -> Result<Task, SyncError> {
        let draft = draft.validated()?;
        let task = self.api.create(draft).await?;
        tracing::info!(task_id = %task.id, "task created");
        self.cache.lock().apply_created(task.clone());
        self.reconcile_stats().await;
        Ok(task)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`] or the update's [`ApiError`].
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, SyncError> {
        let patch = patch.validated()?;
        let task = self.api.update(id, patch).await?;
        tracing::info!(task_id = %id, "task updated");
        self.cache.lock().apply_updated(task.clone());
        // Completion and priority may both have moved.
        self.reconcile_stats().await;
        Ok(task)
    }

    /// Flip the completion flag.
    ///
    /// The current value comes from the cache, or from the server when the
    /// task is not on the cached page.
    ///
    /// # Errors
    ///
    /// The fetch's or update's [`ApiError`].
    pub async fn toggle(&self, id: &TaskId) -> Result<Task, SyncError> {
        let cached = self.cache.lock().task(id).map(|t| t.completed);
        let completed = match cached {
            Some(completed) => completed,
            None => self.api.get(id).await?.completed,
        };
        self.update(id, TaskPatch::completed(!completed)).await
    }

    /// Delete a task.
    ///
    /// # Errors
    ///
    /// The delete's [`ApiError`].
    pub async fn delete(&self, id: &TaskId) -> Result<(), SyncError> {
        self.api.delete(id).await?;
        tracing::info!(task_id = %id, "task deleted");
        self.cache.lock().apply_deleted(id);
        self.reconcile_stats().await;
        Ok(())
    }
}
