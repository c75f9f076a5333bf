//! Taskdeck server: per-user task lists over REST and WebSocket RPC.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:5000
//! cargo run --bin taskdeck-server
//!
//! # Run on custom address with an explicit config file
//! cargo run --bin taskdeck-server -- --bind 127.0.0.1:8080 --config taskdeck.toml
//!
//! # Or via environment variable
//! TASKDECK_ADDR=127.0.0.1:8080 cargo run --bin taskdeck-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskdeck_server::config::{ServerCliArgs, ServerConfig};
use taskdeck_server::server::{self, AppState};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if config.tokens.is_empty() {
        tracing::warn!("no [auth.tokens] configured, every request will be refused");
    }
    tracing::info!(
        addr = %config.bind_addr,
        tokens = config.tokens.len(),
        max_page_size = config.max_page_size,
        "starting taskdeck server"
    );

    let state = Arc::new(AppState::with_config(&config));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "taskdeck server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
