use super::{
    client::ClientHandle,
    hub::{Hub, HubCommand},
};
use crate::core::Error;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, oneshot, Mutex};
use uuid::Uuid;

// ========================// HubHandle //======================== //

/// Sending side of one hub's control channel.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Register a client and wait for the hub to take it.
    ///
    /// Fails when the hub retired between `resolve` and the
    /// acknowledgement; callers go through [`RoomRegistry::join`], which
    /// resolves again instead of dropping the join.
    pub async fn register(&self, client: ClientHandle) -> Result<(), Error> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx.send(HubCommand::Register(client, ack_tx)).await?;
        ack_rx.await.map_err(|_| Error::RoomClosed)
    }

    /// Best-effort: unregistering against a retired hub is a no-op.
    pub async fn unregister(&self, id: Uuid) {
        let _ = self.tx.send(HubCommand::Unregister(id)).await;
    }

    /// Queue a text frame for fan-out to every client of the room.
    pub async fn broadcast(&self, text: String) -> Result<(), Error> {
        Ok(self.tx.send(HubCommand::Broadcast(text)).await?)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(super) fn same_channel(&self, tx: &mpsc::Sender<HubCommand>) -> bool {
        self.tx.same_channel(tx)
    }
}

// ========================// RoomRegistry //======================== //

/// Process-wide map from room name to its hub.
///
/// Hubs are created lazily on first use and remove themselves once their
/// last client is gone. Creation and removal both run under the one lock
/// in here, which is what keeps a join from racing a teardown.
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<String, HubHandle>>>,
    channel_capacity: usize,
}

impl RoomRegistry {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            channel_capacity,
        }
    }

    /// Return the live hub for the room, creating and spawning one if the
    /// name is unknown or its previous hub has already retired.
    pub async fn resolve(&self, roomname: &str) -> HubHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(roomname) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let handle = HubHandle { tx: tx.clone() };
        rooms.insert(roomname.to_owned(), handle.clone());

        let hub = Hub::new(roomname.to_owned(), tx, rx, Arc::clone(&self.rooms));
        tokio::spawn(hub.run());
        tracing::debug!(room = %roomname, "hub started");

        handle
    }

    /// Register `client` into the room, riding out hub retirement: a hub
    /// that shut down between `resolve` and `register` rejects the
    /// registration, and the next turn of the loop creates a fresh one.
    pub async fn join(&self, roomname: &str, client: ClientHandle) -> HubHandle {
        loop {
            let hub = self.resolve(roomname).await;
            if hub.register(client.clone()).await.is_ok() {
                return hub;
            }
        }
    }

    /// Number of rooms currently alive.
    pub async fn num_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn contains(&self, roomname: &str) -> bool {
        self.rooms.lock().await.contains_key(roomname)
    }
}

// ========================// tests //======================== //

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::Message;
    use tokio::time::{sleep, Duration};

    fn client(username: &str, capacity: usize) -> (ClientHandle, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientHandle::new(username.to_owned(), tx), rx)
    }

    async fn recv_text(rx: &mut mpsc::Receiver<Message>) -> String {
        match rx.recv().await {
            Some(Message::Text(text)) => text,
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    async fn wait_until_absent(registry: &RoomRegistry, roomname: &str) {
        for _ in 0..100 {
            if !registry.contains(roomname).await {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("room {} was never removed", roomname);
    }

    #[tokio::test]
    async fn broadcast_reaches_all_clients_including_sender() {
        let registry = RoomRegistry::new(16);
        let (alice, mut alice_rx) = client("alice", 8);
        let (bob, mut bob_rx) = client("bob", 8);

        let hub = registry.join("lobby", alice).await;
        registry.join("lobby", bob).await;

        hub.broadcast("alice: hi".to_owned()).await.unwrap();

        assert_eq!(recv_text(&mut alice_rx).await, "alice: hi");
        assert_eq!(recv_text(&mut bob_rx).await, "alice: hi");
    }

    #[tokio::test]
    async fn unregister_closes_queue_and_is_idempotent() {
        let registry = RoomRegistry::new(16);
        let (alice, mut alice_rx) = client("alice", 8);
        let (bob, mut bob_rx) = client("bob", 8);
        let bob_id = bob.id();

        let hub = registry.join("lobby", alice).await;
        registry.join("lobby", bob).await;

        hub.unregister(bob_id).await;
        // unregistering an absent client is a no-op
        hub.unregister(bob_id).await;

        hub.broadcast("alice: still here?".to_owned()).await.unwrap();

        assert_eq!(recv_text(&mut alice_rx).await, "alice: still here?");
        assert!(bob_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn slow_consumer_is_evicted_without_stalling_the_room() {
        let registry = RoomRegistry::new(16);
        let (alice, mut alice_rx) = client("alice", 8);
        let (carol, mut carol_rx) = client("carol", 2);

        let hub = registry.join("busy", alice).await;
        registry.join("busy", carol).await;

        for n in 1..=3 {
            hub.broadcast(format!("msg {}", n)).await.unwrap();
        }

        // carol's queue held two frames; the third offer evicted her
        assert_eq!(recv_text(&mut carol_rx).await, "msg 1");
        assert_eq!(recv_text(&mut carol_rx).await, "msg 2");
        assert!(carol_rx.recv().await.is_none());

        for n in 1..=3 {
            assert_eq!(recv_text(&mut alice_rx).await, format!("msg {}", n));
        }

        // evicted clients are not considered for later broadcasts
        hub.broadcast("msg 4".to_owned()).await.unwrap();
        assert_eq!(recv_text(&mut alice_rx).await, "msg 4");
    }

    #[tokio::test]
    async fn empty_room_is_removed_and_recreated_fresh() {
        let registry = RoomRegistry::new(16);
        let (alice, mut alice_rx) = client("alice", 8);
        let alice_id = alice.id();

        let hub = registry.join("ephemeral", alice).await;
        assert!(registry.contains("ephemeral").await);

        hub.unregister(alice_id).await;
        assert!(alice_rx.recv().await.is_none());
        wait_until_absent(&registry, "ephemeral").await;

        // a new resolution creates a fresh hub with an empty client set
        let (bob, mut bob_rx) = client("bob", 8);
        let hub = registry.join("ephemeral", bob).await;
        assert!(registry.contains("ephemeral").await);

        hub.broadcast("bob: anyone?".to_owned()).await.unwrap();
        assert_eq!(recv_text(&mut bob_rx).await, "bob: anyone?");
    }

    #[tokio::test]
    async fn stale_handle_fails_while_join_finds_a_fresh_hub() {
        let registry = RoomRegistry::new(16);
        let (alice, _alice_rx) = client("alice", 8);
        let alice_id = alice.id();

        let stale = registry.join("lobby", alice).await;
        stale.unregister(alice_id).await;
        wait_until_absent(&registry, "lobby").await;

        assert!(stale.broadcast("into the void".to_owned()).await.is_err());
        let (bob, _bob_rx) = client("bob", 8);
        assert!(stale.register(bob.clone()).await.is_err());

        // join retries against a fresh hub instead of dropping the join
        let hub = registry.join("lobby", bob).await;
        assert!(registry.contains("lobby").await);
        hub.broadcast("bob: hello".to_owned()).await.unwrap();
    }

    #[tokio::test]
    async fn rooms_are_tracked_per_name() {
        let registry = RoomRegistry::new(16);
        let (alice, mut alice_rx) = client("alice", 8);
        let (bob, mut bob_rx) = client("bob", 8);

        let lobby = registry.join("lobby", alice).await;
        registry.join("den", bob).await;
        assert_eq!(registry.num_rooms().await, 2);

        lobby
            .broadcast("alice: lobby only".to_owned())
            .await
            .unwrap();
        assert_eq!(recv_text(&mut alice_rx).await, "alice: lobby only");

        // no cross-room delivery
        sleep(Duration::from_millis(20)).await;
        assert!(bob_rx.try_recv().is_err());
    }
}
