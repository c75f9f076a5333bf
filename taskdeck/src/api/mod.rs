//! Client-side access to the task service.
//!
//! [`TaskApi`] is the seam the cache synchronizer is written against.
//! [`remote::RemoteApi`] implements it over the WebSocket RPC protocol; tests
//! substitute in-process implementations.

pub mod remote;

use std::future::Future;

use taskdeck_proto::error::{ErrorKind, ErrorReply};
use taskdeck_proto::query::{FilterSpec, TaskPage};
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::{NewTask, Task, TaskId, TaskPatch};

pub use remote::{ConnectOptions, RemoteApi};

/// Errors surfaced by a [`TaskApi`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the input.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The task does not exist for this user.
    #[error("task not found")]
    NotFound,

    /// The credential was refused.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The server could not complete the request.
    #[error("server unavailable: {0}")]
    Unavailable(String),

    /// The connection to the server is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// The server did not answer in time.
    #[error("request timed out")]
    Timeout,

    /// The server answered with something that does not fit the request.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<ErrorReply> for ApiError {
    fn from(reply: ErrorReply) -> Self {
        match reply.kind {
            ErrorKind::Validation => Self::Validation(reply.message),
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Unauthorized => Self::Unauthorized(reply.message),
            ErrorKind::Unavailable => Self::Unavailable(reply.message),
        }
    }
}

/// Operations on the authenticated user's tasks.
///
/// Identity is bound when the implementation is constructed; no method
/// takes an owner.
pub trait TaskApi: Send + Sync {
    /// One filtered, sorted page.
    fn list(
        &self,
        spec: FilterSpec,
    ) -> impl Future<Output = Result<TaskPage, ApiError>> + Send;

    /// A single task.
    fn get(&self, id: &TaskId) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Create a task and return the stored record.
    fn create(&self, draft: NewTask) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Apply a partial update and return the stored record.
    fn update(
        &self,
        id: &TaskId,
        patch: TaskPatch,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Permanently delete a task.
    fn delete(&self, id: &TaskId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Counters over every task of the user.
    fn stats(&self) -> impl Future<Output = Result<StatsSnapshot, ApiError>> + Send;
}
