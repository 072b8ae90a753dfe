//! Broker engine
//!
//! `Broker` ties the topic registry to the set of connected clients:
//! - decoded commands from a client are turned into registry operations
//! - the deliveries the registry hands back are encoded with each
//!   subscriber's serializer and queued on that subscriber's connection
//! - clients that disconnect, or stop draining their queue, are removed from
//!   every topic
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to sit behind `Arc<Mutex<Broker>>`.
//!   Nothing here awaits or blocks: frames are handed to bounded per-client
//!   queues with `try_send`, so the lock is never held across network I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::broker::registry::{Delivery, TopicRegistry};
use crate::client::{Client, ClientId, Enqueue};
use crate::codec::Serializer;
use crate::protocol::{Message, encode_frame};
use crate::utils::{Error, Result};

pub type SharedBroker = Arc<Mutex<Broker>>;

/// Lock a shared broker. A panic while the lock was held cannot leave the
/// registry half-updated in a way later operations care about, so poisoning
/// is ignored.
pub fn lock(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Topic registry plus the clients deliveries can be queued on.
#[derive(Debug, Default)]
pub struct Broker {
    pub registry: TopicRegistry,
    pub clients: HashMap<ClientId, Client>,
}

impl Broker {
    /// Creates a broker with no topics and no clients.
    pub fn new() -> Self {
        Self {
            registry: TopicRegistry::new(),
            clients: HashMap::new(),
        }
    }

    /// Creates an empty broker ready to be shared between connection tasks.
    pub fn shared() -> SharedBroker {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Makes `client` reachable for deliveries. It holds no subscriptions yet.
    pub fn register_client(&mut self, client: Client) {
        debug!("registered {}", client.id);
        self.clients.insert(client.id, client);
    }

    /// Number of clients currently registered.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Apply one command received from `client`. `serializer` is the one the
    /// command's frame was encoded with; it becomes the binding of a new
    /// subscription and the encoding of a topic list reply.
    ///
    /// Errors are protocol errors attributable to the client; the caller is
    /// expected to disconnect it.
    pub fn handle(&mut self, client: ClientId, serializer: Serializer, message: Message) -> Result<()> {
        debug!("{client} sent {} ({serializer})", message.command());

        match message {
            Message::Subscribe { topic } => {
                if let Some(replay) = self.registry.subscribe(&topic, client, serializer) {
                    self.deliver(vec![replay]);
                }
                info!("{client} subscribed to {topic}");
            }
            Message::Publish { topic, message } => {
                let deliveries = self.registry.publish(&topic, &message);
                let fanout = deliveries.len();
                self.deliver(deliveries);
                info!("{client} published to {topic} ({fanout} deliveries)");
            }
            Message::TopicList => {
                let reply = Delivery {
                    client,
                    serializer,
                    message: Message::TopicListResult {
                        topics: self.registry.list_topics(),
                    },
                };
                self.deliver(vec![reply]);
            }
            Message::Unsubscribe { topic } => {
                if self.registry.unsubscribe(&topic, &client) {
                    info!("{client} unsubscribed from {topic}");
                }
            }
            Message::TopicListResult { .. } => {
                return Err(Error::format("topic_list_result is a server-to-client command"));
            }
        }
        Ok(())
    }

    /// Encode and queue each delivery. Clients whose queue is full or closed
    /// are cleaned up once every delivery has been attempted.
    pub fn deliver(&mut self, deliveries: Vec<Delivery>) {
        let mut dropped = Vec::new();

        for delivery in deliveries {
            let Some(target) = self.clients.get(&delivery.client) else {
                warn!("no client registered with id {}", delivery.client);
                continue;
            };

            let frame = match encode_frame(&delivery.message, delivery.serializer) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("cannot encode {} for {}: {e}", delivery.message.command(), delivery.client);
                    continue;
                }
            };

            match target.enqueue(frame) {
                Enqueue::Queued => {}
                Enqueue::Stalled => {
                    warn!("{} is not draining its queue, disconnecting", delivery.client);
                    dropped.push(delivery.client);
                }
                Enqueue::Disconnected => dropped.push(delivery.client),
            }
        }

        for client in dropped {
            self.cleanup_client(&client);
        }
    }

    /// Remove a client from every topic and forget it. Dropping its sender
    /// lets the writer task drain and exit; the reader is asked to stop.
    /// Returns `false` if the client was already gone.
    pub fn cleanup_client(&mut self, client_id: &ClientId) -> bool {
        let removed = self.registry.unsubscribe_all(client_id);

        match self.clients.remove(client_id) {
            Some(client) => {
                client.request_shutdown();
                info!("cleaned up {client_id} ({removed} subscriptions)");
                true
            }
            None => false,
        }
    }
}
