//! WebSocket RPC frames between the Taskdeck client and server.
//!
//! The protocol is simple: the client authenticates with a bearer token,
//! then sends [`ClientFrame::Request`]s tagged with a client-chosen
//! `request_id`. The server answers each with a [`ServerFrame::Response`]
//! carrying the same id. Responses may arrive in any order; the id is the
//! only thing that ties a response to its request.

use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};
use crate::error::ErrorReply;
use crate::query::{FilterSpec, TaskPage};
use crate::stats::StatsSnapshot;
use crate::task::{NewTask, Task, TaskId, TaskPatch};

/// Frames sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientFrame {
    /// Present a bearer credential.
    ///
    /// Must be the first frame after the WebSocket connects. The server
    /// answers with [`ServerFrame::Authenticated`] or an error and close.
    Authenticate {
        /// Opaque bearer token.
        token: String,
    },

    /// An operation on the authenticated owner's tasks.
    Request {
        /// Client-chosen id echoed back in the response.
        request_id: u64,
        /// The operation itself.
        request: TaskRequest,
    },
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerFrame {
    /// Authentication succeeded for this owner.
    Authenticated {
        /// The identity every later request is scoped to.
        owner: String,
    },

    /// Outcome of one request.
    Response {
        /// The `request_id` of the request being answered.
        request_id: u64,
        /// Success payload or error.
        result: Result<TaskResponse, ErrorReply>,
    },

    /// Connection-level failure (bad handshake, undecodable frame).
    Error {
        /// Human-readable error description.
        reason: String,
    },
}

/// Operations a client may request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskRequest {
    /// Fetch one filtered, sorted page.
    List(FilterSpec),
    /// Fetch a single task.
    Get(TaskId),
    /// Create a task.
    Create(NewTask),
    /// Apply a partial update.
    Update {
        /// Target task.
        id: TaskId,
        /// Fields to change.
        patch: TaskPatch,
    },
    /// Hard-delete a task.
    Delete(TaskId),
    /// Aggregate counters over all of the owner's tasks.
    Stats,
}

/// Successful results, one shape per request kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskResponse {
    /// Answer to [`TaskRequest::List`].
    Page(TaskPage),
    /// Answer to `Get`, `Create` and `Update`.
    Task(Task),
    /// Answer to [`TaskRequest::Delete`].
    Deleted(TaskId),
    /// Answer to [`TaskRequest::Stats`].
    Stats(StatsSnapshot),
}

/// Encodes a [`ClientFrame`] into bytes.
///
/// # Errors
///
/// Returns [`CodecError`] if serialization fails.
pub fn encode_client(frame: &ClientFrame) -> Result<Vec<u8>, CodecError> {
    codec::encode(frame)
}

/// Decodes a [`ClientFrame`] from bytes.
///
/// # Errors
///
/// Returns [`CodecError`] if the bytes are not a valid frame.
pub fn decode_client(bytes: &[u8]) -> Result<ClientFrame, CodecError> {
    codec::decode(bytes)
}

/// Encodes a [`ServerFrame`] into bytes.
///
/// # Errors
///
/// Returns [`CodecError`] if serialization fails.
pub fn encode_server(frame: &ServerFrame) -> Result<Vec<u8>, CodecError> {
    codec::encode(frame)
}

/// Decodes a [`ServerFrame`] from bytes.
///
/// # Errors
///
/// Returns [`CodecError`] if the bytes are not a valid frame.
pub fn decode_server(bytes: &[u8]) -> Result<ServerFrame, CodecError> {
    codec::decode(bytes)
}
