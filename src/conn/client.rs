use axum::extract::ws::Message;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// The hub-side face of one connected participant.
///
/// The connection pump keeps only the `Receiver` of the outbound queue; the
/// sole long-lived `Sender` sits in the hub's client set. Removing the handle
/// from that set therefore closes the queue, which is how the writer learns
/// it should send a close frame and finish.
#[derive(Clone)]
pub struct ClientHandle {
    id: Uuid,
    username: String,
    tx: mpsc::Sender<Message>,
}

impl ClientHandle {
    pub fn new(username: String, tx: mpsc::Sender<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Non-blocking enqueue onto the outbound queue.
    pub(super) fn try_send(&self, msg: Message) -> Result<(), TrySendError<Message>> {
        self.tx.try_send(msg)
    }
}
