//! Handlers for websocket

use super::AppState;
use crate::{
    conn::{ClientHandle, HubHandle},
    core::{constant::KEEPALIVE_INTERVAL_SECS, Error},
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::SplitStream, StreamExt};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::{
    sync::mpsc,
    time::{self, Duration},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", get(ws_handler))
}

// ========================// Wire protocol //======================== //

/// One frame as sent by clients. The first frame of a connection names the
/// user and the room; after that, `message` frames carry chat text and
/// `auth` frames rebind the connection to another user.
#[derive(Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub roomname: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Auth,
    Message,
}

// ========================// Websocket Handler //======================== //

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket(socket, state))
}

/// Drive one connection: handshake, two pump tasks, one cleanup point.
async fn websocket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // The first frame names the user and the room; nothing is registered
    // until both check out.
    let Some(hello) = read_envelope(&mut receiver).await else {
        return;
    };
    let Some(user) = state.users.lookup(&hello.username) else {
        tracing::warn!(username = %hello.username, "rejecting websocket for unknown user");
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    let (tx, mut rx) = mpsc::channel(state.config.client_channel_capacity);
    let client = ClientHandle::new(user.username.clone(), tx);
    let client_id = client.id();
    let hub = state.rooms.join(&hello.roomname, client).await;

    // auth frames may rebind the identity mid-stream, and the cleanup
    // below wants the name that is current at disconnect time
    let username = Arc::new(Mutex::new(user.username));

    let joined = format!("{} has joined the chat!", username.lock().unwrap());
    let _ = hub.broadcast(joined).await;

    // this task drains the outbound queue to the socket; a closed queue is
    // the hub saying the client was unregistered or evicted
    let mut send_task = tokio::spawn(async move {
        let mut keepalive = time::interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECS));
        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = keepalive.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // this task decodes client frames and forwards them to the hub
    // TODO: cap inbound frame size before decoding
    let mut recv_task = {
        let state = state.clone();
        let hub = hub.clone();
        let username = username.clone();

        tokio::spawn(async move {
            while let Some(Ok(frame)) = receiver.next().await {
                match frame {
                    Message::Text(text) => {
                        let Ok(envelope) = serde_json::from_str::<Envelope>(&text) else {
                            tracing::debug!("malformed frame, closing connection");
                            break;
                        };
                        if handle_envelope(&state, &hub, &username, envelope)
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        })
    };

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // single cleanup point: either pump exiting fully resolves the
    // connection, eviction included
    let name = username.lock().unwrap().clone();
    let _ = hub.broadcast(format!("{} has left the chat!", name)).await;
    hub.unregister(client_id).await;
    tracing::debug!(username = %name, "websocket closed");
}

/// Route one decoded frame; an error ends the connection.
async fn handle_envelope(
    state: &Arc<AppState>,
    hub: &HubHandle,
    username: &Arc<Mutex<String>>,
    envelope: Envelope,
) -> Result<(), Error> {
    match envelope.kind {
        EnvelopeKind::Message => {
            let line = format!("{}: {}", username.lock().unwrap(), envelope.text);
            hub.broadcast(line).await
        }
        EnvelopeKind::Auth => {
            let Some(user) = state.users.lookup(&envelope.username) else {
                tracing::warn!(username = %envelope.username, "auth frame for unknown user");
                return Err(Error::UserNotExist);
            };
            *username.lock().unwrap() = user.username.clone();
            hub.broadcast(format!("{} has joined the chat!", user.username))
                .await
        }
    }
}

/// Read frames until the first text envelope; `None` means the peer is gone
/// or opened with garbage.
async fn read_envelope(receiver: &mut SplitStream<WebSocket>) -> Option<Envelope> {
    while let Some(Ok(frame)) = receiver.next().await {
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}
