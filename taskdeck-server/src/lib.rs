//! Taskdeck server library.
//!
//! Exposes the query engine, the task service and both network surfaces
//! (REST under `/api/tasks`, binary RPC at `/ws`) for use in tests and
//! embedding.

pub mod auth;
pub mod config;
pub mod http;
pub mod query;
pub mod results;
pub mod server;
pub mod service;
pub mod stats;
pub mod store;
pub mod ws;
