use super::{client::ClientHandle, registry::HubHandle};
use axum::extract::ws::Message;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot, Mutex,
};
use uuid::Uuid;

/// Inputs of a hub's control loop, serialized through one channel.
pub enum HubCommand {
    /// A new client joins the room; the ack fires once the hub took it.
    Register(ClientHandle, oneshot::Sender<()>),
    /// A client left the room
    Unregister(Uuid),
    /// Send a text frame to all clients in this room
    Broadcast(String),
}

/// Per-room actor.
///
/// The client set is owned by the control loop and never touched from
/// outside it; membership and fan-out are serialized by the loop instead of
/// a lock. The only shared state the hub touches is the registry map, when
/// it removes itself on becoming empty.
pub struct Hub {
    roomname: String,
    clients: HashMap<Uuid, ClientHandle>,
    tx: mpsc::Sender<HubCommand>,
    rx: mpsc::Receiver<HubCommand>,
    rooms: Arc<Mutex<HashMap<String, HubHandle>>>,
}

impl Hub {
    pub(super) fn new(
        roomname: String,
        tx: mpsc::Sender<HubCommand>,
        rx: mpsc::Receiver<HubCommand>,
        rooms: Arc<Mutex<HashMap<String, HubHandle>>>,
    ) -> Self {
        Self {
            roomname,
            clients: HashMap::new(),
            tx,
            rx,
            rooms,
        }
    }

    pub(super) async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                HubCommand::Register(client, ack) => {
                    tracing::debug!(
                        room = %self.roomname,
                        username = %client.username(),
                        "client registered"
                    );
                    self.clients.insert(client.id(), client);
                    let _ = ack.send(());
                }
                HubCommand::Unregister(id) => {
                    if self.clients.remove(&id).is_some() {
                        tracing::debug!(room = %self.roomname, "client unregistered");
                    }
                    if self.clients.is_empty() {
                        self.retire().await;
                        return;
                    }
                }
                HubCommand::Broadcast(text) => {
                    self.fan_out(text);
                    if self.clients.is_empty() {
                        self.retire().await;
                        return;
                    }
                }
            }
        }
    }

    /// Offer the frame to every client without ever awaiting one of them.
    /// A full outbound queue means a slow consumer; the client is dropped
    /// from the set on the spot, which closes its queue.
    fn fan_out(&mut self, text: String) {
        let msg = Message::Text(text);
        let roomname = &self.roomname;
        self.clients
            .retain(|_, client| match client.try_send(msg.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        room = %roomname,
                        username = %client.username(),
                        "outbound queue full, evicting slow client"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            });
    }

    /// Leave the registry and reject anything still queued.
    ///
    /// The entry is removed and the inbox closed in one critical section of
    /// the registry lock, so a concurrent resolution either got this hub
    /// before the removal or creates a fresh one after it. Commands that
    /// were already buffered are drained below: dropping a `Register`'s ack
    /// makes the joining side resolve again instead of losing the join.
    async fn retire(&mut self) {
        {
            let mut rooms = self.rooms.lock().await;
            if let Some(handle) = rooms.get(&self.roomname) {
                if handle.same_channel(&self.tx) {
                    rooms.remove(&self.roomname);
                }
            }
            self.rx.close();
        }
        while let Ok(cmd) = self.rx.try_recv() {
            drop(cmd);
        }
        tracing::debug!(room = %self.roomname, "room empty, hub retired");
    }
}
