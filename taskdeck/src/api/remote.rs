//! WebSocket RPC client for the Taskdeck server.
//!
//! One connection multiplexes any number of in-flight requests. Each
//! request gets a fresh `request_id`; a background reader task routes every
//! `Response` to the waiting caller by that id, so responses may arrive in
//! any order without being attributed to the wrong request.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use taskdeck_proto::error::ErrorReply;
use taskdeck_proto::query::{FilterSpec, TaskPage};
use taskdeck_proto::rpc::{self, ClientFrame, ServerFrame, TaskRequest, TaskResponse};
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::{NewTask, OwnerId, Task, TaskId, TaskPatch};
use tokio::sync::{Mutex, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::{ApiError, TaskApi};

type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

type Reply = Result<TaskResponse, ErrorReply>;

/// Requests awaiting a response, by `request_id`.
type PendingMap = parking_lot::Mutex<HashMap<u64, oneshot::Sender<Reply>>>;

/// Timeouts applied by [`RemoteApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Bound on TCP/WebSocket setup plus the authentication round trip.
    pub connect_timeout: Duration,
    /// Bound on each individual request.
    pub request_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// [`TaskApi`] over a WebSocket connection.
pub struct RemoteApi {
    owner: OwnerId,
    server_url: String,
    ws_sender: Arc<Mutex<WsSender>>,
    pending: Arc<PendingMap>,
    next_request_id: AtomicU64,
    connected: Arc<AtomicBool>,
    request_timeout: Duration,
    reader_handle: tokio::task::JoinHandle<()>,
}

impl RemoteApi {
    /// Connect to `server_url` (`ws://` or `wss://`) and authenticate with
    /// `token`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Protocol`] for a malformed URL or handshake.
    /// - [`ApiError::Timeout`] if connecting or authenticating takes longer
    ///   than `options.connect_timeout`.
    /// - [`ApiError::Unavailable`] if the server cannot be reached.
    /// - [`ApiError::Unauthorized`] if the token is refused.
    pub async fn connect(
        server_url: &str,
        token: &str,
        options: ConnectOptions,
    ) -> Result<Self, ApiError> {
        let url = Url::parse(server_url)
            .map_err(|e| ApiError::Protocol(format!("invalid server url {server_url:?}: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ApiError::Protocol(format!(
                "server url must use ws:// or wss://, got {}://",
                url.scheme()
            )));
        }

        let (ws_stream, _response) =
            tokio::time::timeout(options.connect_timeout, connect_async(url.as_str()))
                .await
                .map_err(|_| {
                    tracing::warn!(url = server_url, "WebSocket connect timed out");
                    ApiError::Timeout
                })?
                .map_err(|e| {
                    tracing::warn!(url = server_url, err = %e, "WebSocket connect failed");
                    map_ws_connect_error(e)
                })?;

        let (mut ws_sender, mut ws_reader) = ws_stream.split();

        let hello = ClientFrame::Authenticate {
            token: token.to_string(),
        };
        let bytes = rpc::encode_client(&hello).map_err(|e| ApiError::Protocol(e.to_string()))?;
        ws_sender
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "failed to send Authenticate frame");
                ApiError::ConnectionClosed
            })?;

        let ack = tokio::time::timeout(options.connect_timeout, ws_reader.next())
            .await
            .map_err(|_| {
                tracing::warn!(url = server_url, "authentication acknowledgment timed out");
                ApiError::Timeout
            })?;
        let owner = read_authenticated(ack)?;
        tracing::info!(owner = %owner, url = server_url, "connected to task server");

        let pending = Arc::new(PendingMap::default());
        let connected = Arc::new(AtomicBool::new(true));
        let reader_handle = tokio::spawn(reader_loop(
            ws_reader,
            Arc::clone(&pending),
            Arc::clone(&connected),
        ));

        Ok(Self {
            owner,
            server_url: server_url.to_string(),
            ws_sender: Arc::new(Mutex::new(ws_sender)),
            pending,
            next_request_id: AtomicU64::new(1),
            connected,
            request_timeout: options.request_timeout,
            reader_handle,
        })
    }

    /// The identity the server resolved our token to.
    #[must_use]
    pub const fn owner(&self) -> &OwnerId {
        &self.owner
    }

    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Whether the connection is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Send a close frame. In-flight requests fail with
    /// [`ApiError::ConnectionClosed`] once the server acknowledges.
    pub async fn close(&self) {
        let mut sender = self.ws_sender.lock().await;
        if let Err(e) = sender.send(Message::Close(None)).await {
            tracing::debug!(err = %e, "close frame not sent");
        }
    }

    /// Send one request and wait for the response carrying its id.
    ///
    /// A frame the server cannot decode is answered without an id, so such
    /// a request fails with [`ApiError::Timeout`].
    async fn call(&self, request: TaskRequest) -> Result<TaskResponse, ApiError> {
        if !self.is_connected() {
            return Err(ApiError::ConnectionClosed);
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id, tx);

        let frame = ClientFrame::Request {
            request_id,
            request,
        };
        let bytes = match rpc::encode_client(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.pending.lock().remove(&request_id);
                return Err(ApiError::Protocol(e.to_string()));
            }
        };

        let sent = {
            let mut sender = self.ws_sender.lock().await;
            sender.send(Message::Binary(bytes.into())).await
        };
        if let Err(e) = sent {
            tracing::warn!(request_id, err = %e, "request send failed");
            self.pending.lock().remove(&request_id);
            self.connected.store(false, Ordering::Relaxed);
            return Err(ApiError::ConnectionClosed);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply.map_err(ApiError::from),
            Ok(Err(_)) => Err(ApiError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().remove(&request_id);
                tracing::warn!(request_id, "request timed out");
                Err(ApiError::Timeout)
            }
        }
    }
}

impl Drop for RemoteApi {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

fn unexpected(response: &TaskResponse) -> ApiError {
    ApiError::Protocol(format!("unexpected response: {response:?}"))
}

impl TaskApi for RemoteApi {
    async fn list(&self, spec: FilterSpec) -> Result<TaskPage, ApiError> {
        match self.call(TaskRequest::List(spec)).await? {
            TaskResponse::Page(page) => Ok(page),
            other => Err(unexpected(&other)),
        }
    }

    async fn get(&self, id: &TaskId) -> Result<Task, ApiError> {
        match self.call(TaskRequest::Get(id.clone())).await? {
            TaskResponse::Task(task) => Ok(task),
            other => Err(unexpected(&other)),
        }
    }

    async fn create(&self, draft: NewTask) -> Result<Task, ApiError> {
        match self.call(TaskRequest::Create(draft)).await? {
            TaskResponse::Task(task) => Ok(task),
            other => Err(unexpected(&other)),
        }
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, ApiError> {
        let request = TaskRequest::Update {
            id: id.clone(),
            patch,
        };
        match self.call(request).await? {
            TaskResponse::Task(task) => Ok(task),
            other => Err(unexpected(&other)),
        }
    }

    async fn delete(&self, id: &TaskId) -> Result<(), ApiError> {
        match self.call(TaskRequest::Delete(id.clone())).await? {
            TaskResponse::Deleted(deleted) if &deleted == id => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    async fn stats(&self) -> Result<StatsSnapshot, ApiError> {
        match self.call(TaskRequest::Stats).await? {
            TaskResponse::Stats(stats) => Ok(stats),
            other => Err(unexpected(&other)),
        }
    }
}

/// Interpret the first server frame after `Authenticate`.
fn read_authenticated(
    ack: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
) -> Result<OwnerId, ApiError> {
    match ack {
        Some(Ok(Message::Binary(data))) => match rpc::decode_server(&data) {
            Ok(ServerFrame::Authenticated { owner }) => Ok(OwnerId::new(owner)),
            Ok(ServerFrame::Error { reason }) => {
                tracing::warn!(reason = %reason, "authentication rejected");
                Err(ApiError::Unauthorized(reason))
            }
            Ok(other) => {
                tracing::warn!(?other, "unexpected frame during authentication");
                Err(ApiError::Protocol(
                    "unexpected frame during authentication".to_string(),
                ))
            }
            Err(e) => Err(ApiError::Protocol(format!(
                "malformed authentication response: {e}"
            ))),
        },
        Some(Ok(Message::Close(_))) | None => Err(ApiError::ConnectionClosed),
        Some(Ok(_)) => Err(ApiError::Protocol(
            "unexpected non-binary frame during authentication".to_string(),
        )),
        Some(Err(e)) => {
            tracing::warn!(err = %e, "WebSocket error during authentication");
            Err(ApiError::ConnectionClosed)
        }
    }
}

/// Route responses to their waiting callers until the socket closes.
///
/// Malformed frames are logged and skipped. On exit every still-pending
/// request is failed by dropping its sender.
async fn reader_loop(mut ws_reader: WsReader, pending: Arc<PendingMap>, connected: Arc<AtomicBool>) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Binary(data)) => match rpc::decode_server(&data) {
                Ok(ServerFrame::Response { request_id, result }) => {
                    let waiter = pending.lock().remove(&request_id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(result);
                        }
                        None => {
                            tracing::debug!(request_id, "response for unknown or expired request");
                        }
                    }
                }
                Ok(ServerFrame::Error { reason }) => {
                    // Not tied to a request id; whatever it refers to times out.
                    let in_flight = pending.lock().len();
                    tracing::warn!(
                        reason = %reason,
                        in_flight,
                        "server rejected a frame, the matching request will time out"
                    );
                }
                Ok(ServerFrame::Authenticated { .. }) => {
                    tracing::debug!("ignoring repeated Authenticated frame");
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed server frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(err = %e, "WebSocket read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
    pending.lock().clear();
    tracing::debug!("reader task exiting");
}

fn map_ws_connect_error(err: tokio_tungstenite::tungstenite::Error) -> ApiError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => ApiError::Unavailable(format!("cannot reach server: {io_err}")),
        WsError::Tls(_) => ApiError::Unavailable(format!("TLS error: {err}")),
        WsError::Http(response) => ApiError::Unavailable(format!(
            "server HTTP error: status {}",
            response.status()
        )),
        other => ApiError::Unavailable(format!("connection error: {other}")),
    }
}
