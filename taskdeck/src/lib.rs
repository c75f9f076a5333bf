//! Taskdeck client library: remote API, cache synchronizer and rendering.

pub mod api;
pub mod config;
pub mod display;
pub mod sync;
