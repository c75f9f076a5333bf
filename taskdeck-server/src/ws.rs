//! WebSocket RPC surface at `/ws`.
//!
//! Connection lifecycle:
//! 1. Wait for an `Authenticate` frame and resolve its token.
//! 2. Answer `Authenticated` (or `Error` and hang up).
//! 3. Serve `Request` frames. Each runs on its own task and its `Response`
//!    is written whenever it completes, so answers may overtake each other.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use taskdeck_proto::rpc::{self, ClientFrame, ServerFrame};
use taskdeck_proto::task::OwnerId;
use tokio::sync::mpsc;

use crate::auth::Authenticator;
use crate::server::AppState;

/// axum handler that upgrades an HTTP request to a WebSocket connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serve one client connection until either side closes it.
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let owner = match wait_for_authenticate(&mut ws_receiver, &state).await {
        Ok(owner) => owner,
        Err(Some(reason)) => {
            tracing::warn!(reason = %reason, "websocket authentication failed");
            let _ = send_frame(&mut ws_sender, &ServerFrame::Error { reason }).await;
            let _ = ws_sender.send(Message::Close(None)).await;
            return;
        }
        Err(None) => {
            tracing::debug!("connection closed before authentication");
            return;
        }
    };

    let ack = ServerFrame::Authenticated {
        owner: owner.as_str().to_string(),
    };
    if let Err(e) = send_frame(&mut ws_sender, &ack).await {
        tracing::error!(owner = %owner, error = %e, "failed to send Authenticated ack");
        return;
    }
    tracing::info!(owner = %owner, "client authenticated");

    // Request tasks hand their answers to a single writer.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let writer_owner = owner.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(owner = %writer_owner, "WebSocket write failed");
                break;
            }
        }
    });

    let reader_owner = owner.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Binary(data) => {
                    handle_binary_message(&reader_owner, &data, &state, &tx);
                }
                Message::Close(_) => {
                    tracing::debug!(owner = %reader_owner, "received close frame");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    tracing::info!(owner = %owner, "client disconnected");
}

/// Read frames until an `Authenticate` arrives.
///
/// `Err(None)` means the peer went away; `Err(Some(reason))` means it sent
/// something that must be refused.
async fn wait_for_authenticate(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    state: &AppState,
) -> Result<OwnerId, Option<String>> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Binary(data) => {
                return match rpc::decode_client(&data) {
                    Ok(ClientFrame::Authenticate { token }) => state
                        .auth
                        .authenticate(&token)
                        .map_err(|e| Some(e.to_string())),
                    Ok(ClientFrame::Request { .. }) => {
                        Err(Some("not authorized, authenticate first".to_string()))
                    }
                    Err(e) => Err(Some(format!("malformed frame: {e}"))),
                };
            }
            Message::Close(_) => return Err(None),
            _ => {}
        }
    }
    Err(None)
}

/// Decode one frame and, for a request, spawn its handler.
///
/// An undecodable frame has no readable request id, so it is answered with
/// a connection-level [`ServerFrame::Error`]. The sender's request is left
/// to run into its timeout.
fn handle_binary_message(
    owner: &OwnerId,
    data: &[u8],
    state: &Arc<AppState>,
    tx: &mpsc::UnboundedSender<Message>,
) {
    match rpc::decode_client(data) {
        Ok(ClientFrame::Request {
            request_id,
            request,
        }) => {
            let owner = owner.clone();
            let state = Arc::clone(state);
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = state.service.handle(&owner, request).await;
                queue_frame(&tx, &ServerFrame::Response { request_id, result });
            });
        }
        Ok(ClientFrame::Authenticate { .. }) => {
            tracing::warn!(owner = %owner, "duplicate Authenticate on an authenticated connection");
            queue_frame(
                tx,
                &ServerFrame::Error {
                    reason: "already authenticated".to_string(),
                },
            );
        }
        Err(e) => {
            tracing::warn!(owner = %owner, error = %e, "failed to decode frame");
            queue_frame(
                tx,
                &ServerFrame::Error {
                    reason: format!("malformed frame: {e}"),
                },
            );
        }
    }
}

fn queue_frame(tx: &mpsc::UnboundedSender<Message>, frame: &ServerFrame) {
    match rpc::encode_server(frame) {
        Ok(bytes) => {
            let _ = tx.send(Message::Binary(bytes.into()));
        }
        Err(e) => tracing::error!(error = %e, "failed to encode server frame"),
    }
}

async fn send_frame(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    frame: &ServerFrame,
) -> Result<(), String> {
    let bytes = rpc::encode_server(frame).map_err(|e| e.to_string())?;
    ws_sender
        .send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| format!("WebSocket send error: {e}"))
}
