use std::fmt;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Handle identifying one accepted connection for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0.simple())
    }
}

/// Outcome of queueing a frame for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    /// The outbound queue is full; the client is not keeping up.
    Stalled,
    /// The writer side is gone.
    Disconnected,
}

/// A connected peer as seen by the broker.
///
/// `sender` feeds the connection's writer task with encoded frames. The queue
/// is bounded, so enqueueing never blocks the broker. `shutdown` asks the
/// connection's reader to stop.
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub sender: Sender<Vec<u8>>,
    shutdown: Arc<Notify>,
}

impl Client {
    pub fn new(sender: Sender<Vec<u8>>, shutdown: Arc<Notify>) -> Self {
        Self {
            id: ClientId::new(),
            sender,
            shutdown,
        }
    }

    pub fn enqueue(&self, frame: Vec<u8>) -> Enqueue {
        match self.sender.try_send(frame) {
            Ok(()) => Enqueue::Queued,
            Err(TrySendError::Full(_)) => Enqueue::Stalled,
            Err(TrySendError::Closed(_)) => Enqueue::Disconnected,
        }
    }

    /// Wake the connection's reader so it tears the connection down.
    pub fn request_shutdown(&self) {
        // notify_one keeps a permit if the reader is not waiting yet
        self.shutdown.notify_one();
    }
}
