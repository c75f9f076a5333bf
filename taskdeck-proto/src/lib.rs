//! Shared task model and wire protocol for Taskdeck.

pub mod codec;
pub mod error;
pub mod query;
pub mod rpc;
pub mod stats;
pub mod task;
