//! Shared server state, router assembly and the listener entry points.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use taskdeck_proto::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use crate::auth::TokenAuthenticator;
use crate::config::ServerConfig;
use crate::http;
use crate::service::TaskService;
use crate::store::MemoryStore;
use crate::ws;

/// State shared by every connection and request handler.
pub struct AppState {
    pub service: TaskService<MemoryStore>,
    pub auth: TokenAuthenticator,
    /// Page size applied when an HTTP list request omits `limit`.
    pub default_page_size: u32,
}

impl AppState {
    /// Empty store, default page sizes and the given token table.
    #[must_use]
    pub fn new(auth: TokenAuthenticator) -> Self {
        Self {
            service: TaskService::new(MemoryStore::new(), MAX_PAGE_SIZE),
            auth,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// State built from a resolved [`ServerConfig`].
    #[must_use]
    pub fn with_config(config: &ServerConfig) -> Self {
        Self {
            service: TaskService::new(MemoryStore::new(), config.max_page_size),
            auth: TokenAuthenticator::new(config.tokens.clone()),
            default_page_size: config.default_page_size,
        }
    }
}

/// Build the full router: REST routes under `/api/tasks` plus `/ws`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(http::routes())
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

type StartResult = Result<
    (SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
>;

/// Starts the server on `addr` with an empty store and the given tokens.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(addr: &str, auth: TokenAuthenticator) -> StartResult {
    start_server_with_state(addr, Arc::new(AppState::new(auth))).await
}

/// Starts the server with a pre-built [`AppState`] and returns the bound
/// address plus the serving task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(addr: &str, state: Arc<AppState>) -> StartResult {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "task server error");
        }
    });

    Ok((bound_addr, handle))
}
