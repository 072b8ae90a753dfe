//! Topic management
//!
//! A `Topic` holds the subscribers of one exact path together with the last
//! value published to that path. Subscribers keep insertion order and a client
//! appears at most once per topic.

use crate::client::ClientId;
use crate::codec::Serializer;

/// A client subscribed to a topic, with the serializer chosen at subscribe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscriber {
    pub client: ClientId,
    pub serializer: Serializer,
}

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: Vec<Subscriber>,
    /// Last value published to exactly this path; empty until the first publish.
    pub retained: String,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Vec::new(),
            retained: String::new(),
        }
    }

    /// Add a subscriber. Returns `false` when the client was already
    /// subscribed, in which case its original serializer is kept.
    pub fn subscribe(&mut self, client: ClientId, serializer: Serializer) -> bool {
        if self.is_subscribed(&client) {
            return false;
        }
        self.subscribers.push(Subscriber { client, serializer });
        true
    }

    /// Remove a subscriber. Returns whether anything was removed.
    pub fn unsubscribe(&mut self, client: &ClientId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.client != *client);
        self.subscribers.len() != before
    }

    pub fn is_subscribed(&self, client: &ClientId) -> bool {
        self.subscribers.iter().any(|s| s.client == *client)
    }
}
