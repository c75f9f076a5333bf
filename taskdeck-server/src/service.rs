//! Task service: the operation facade both surfaces call into.
//!
//! Every operation takes the authenticated [`OwnerId`] explicitly; nothing
//! here reads identity from anywhere else. Input is validated before the
//! store is touched, so a rejected request has no side effects.

use taskdeck_proto::error::{ErrorKind, ErrorReply, ValidationError};
use taskdeck_proto::query::{FilterSpec, TaskPage};
use taskdeck_proto::rpc::{TaskRequest, TaskResponse};
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::{NewTask, OwnerId, Task, TaskId, TaskPatch};

use crate::query;
use crate::results;
use crate::stats;
use crate::store::{StoreError, TaskStore};

/// Errors returned by [`TaskService`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request was rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No such task for this owner.
    #[error("task not found")]
    NotFound,
    /// The store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }
}

impl From<ServiceError> for ErrorReply {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::NotFound => Self::new(ErrorKind::NotFound, "task not found"),
            // Store details stay in the server log.
            ServiceError::StoreUnavailable(_) => {
                Self::new(ErrorKind::Unavailable, "server error")
            }
        }
    }
}

/// Binds the query compiler, result assembler and aggregation engine to a
/// store.
pub struct TaskService<S> {
    store: S,
    max_page_size: u32,
}

impl<S: TaskStore> TaskService<S> {
    /// Creates a service over `store` clamping page sizes to `max_page_size`.
    pub const fn new(store: S, max_page_size: u32) -> Self {
        Self {
            store,
            max_page_size,
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// One filtered, sorted page of `owner`'s tasks.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for a page below 1, otherwise store
    /// failures.
    pub async fn list(&self, owner: &OwnerId, spec: &FilterSpec) -> Result<TaskPage, ServiceError> {
        let plan = query::compile(spec, owner.clone(), self.max_page_size).inspect_err(|e| {
            tracing::warn!(owner = %owner, error = %e, "rejected list request");
        })?;
        results::assemble(&self.store, &plan)
            .await
            .map_err(|e| log_store_error(owner, "list", e))
    }

    /// A single task.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] when the task does not exist or belongs
    /// to another owner.
    pub async fn get(&self, owner: &OwnerId, id: &TaskId) -> Result<Task, ServiceError> {
        let task = self
            .store
            .get(id, owner)
            .await
            .map_err(|e| log_store_error(owner, "get", e))?;
        tracing::debug!(owner = %owner, task_id = %id, "fetched task");
        Ok(task)
    }

    /// Validate and persist a new task.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for a bad title or description.
    pub async fn create(&self, owner: &OwnerId, draft: NewTask) -> Result<Task, ServiceError> {
        let draft = draft.validated().inspect_err(|e| {
            tracing::warn!(owner = %owner, error = %e, "rejected create request");
        })?;
        let task = self
            .store
            .insert(owner, draft)
            .await
            .map_err(|e| log_store_error(owner, "create", e))?;
        tracing::info!(
            owner = %owner,
            task_id = %task.id,
            priority = %task.priority,
            "task created"
        );
        Ok(task)
    }

    /// Validate and apply a partial update.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] or [`ServiceError::NotFound`].
    pub async fn update(
        &self,
        owner: &OwnerId,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<Task, ServiceError> {
        let patch = patch.validated().inspect_err(|e| {
            tracing::warn!(owner = %owner, task_id = %id, error = %e, "rejected update request");
        })?;
        let task = self
            .store
            .update_by_id(id, owner, &patch)
            .await
            .map_err(|e| log_store_error(owner, "update", e))?;
        tracing::info!(
            owner = %owner,
            task_id = %id,
            completed = task.completed,
            "task updated"
        );
        Ok(task)
    }

    /// Hard-delete a task.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] when the task does not exist or belongs
    /// to another owner.
    pub async fn delete(&self, owner: &OwnerId, id: &TaskId) -> Result<(), ServiceError> {
        self.store
            .delete_by_id(id, owner)
            .await
            .map_err(|e| log_store_error(owner, "delete", e))?;
        tracing::info!(owner = %owner, task_id = %id, "task deleted");
        Ok(())
    }

    /// Counters over all of `owner`'s tasks, ignoring any list filter.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn stats(&self, owner: &OwnerId) -> Result<StatsSnapshot, ServiceError> {
        stats::aggregate(&self.store, owner)
            .await
            .map_err(|e| log_store_error(owner, "stats", e))
    }

    /// Dispatch one RPC request.
    ///
    /// # Errors
    ///
    /// The failing operation's [`ServiceError`] converted to an [`ErrorReply`].
    pub async fn handle(
        &self,
        owner: &OwnerId,
        request: TaskRequest,
    ) -> Result<TaskResponse, ErrorReply> {
        let response = match request {
            TaskRequest::List(spec) => self.list(owner, &spec).await.map(TaskResponse::Page),
            TaskRequest::Get(id) => self.get(owner, &id).await.map(TaskResponse::Task),
            TaskRequest::Create(draft) => self.create(owner, draft).await.map(TaskResponse::Task),
            TaskRequest::Update { id, patch } => {
                self.update(owner, &id, patch).await.map(TaskResponse::Task)
            }
            TaskRequest::Delete(id) => self
                .delete(owner, &id)
                .await
                .map(|()| TaskResponse::Deleted(id)),
            TaskRequest::Stats => self.stats(owner).await.map(TaskResponse::Stats),
        };
        response.map_err(ErrorReply::from)
    }
}

fn log_store_error(owner: &OwnerId, op: &'static str, err: StoreError) -> ServiceError {
    match &err {
        StoreError::NotFound => tracing::debug!(owner = %owner, op, "task not found"),
        StoreError::Unavailable(reason) => {
            tracing::error!(owner = %owner, op, reason = %reason, "store failure");
        }
    }
    err.into()
}
