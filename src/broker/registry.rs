//! Topic registry
//!
//! Maps topic paths to their subscribers and retained value. Paths are `/`
//! delimited and a publish is delivered to the subscribers of the path itself
//! and of every ancestor (`a/b/c` reaches `a/b/c`, `a/b` and `a`), never to
//! descendants or siblings.
//!
//! The registry performs no I/O. Operations that deliver something return the
//! list of [`Delivery`] values to perform, copied out of the subscriber lists,
//! so the caller can send them without holding on to the registry.

use std::collections::HashMap;

use crate::broker::topic::{Subscriber, Topic};
use crate::client::ClientId;
use crate::codec::Serializer;
use crate::protocol::Message;

/// One message to send to one client with the serializer bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub client: ClientId,
    pub serializer: Serializer,
    pub message: Message,
}

/// The path itself followed by each ancestor, obtained by trimming the last
/// `/`-delimited segment until none is left.
pub fn ancestors(topic: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(topic), |&path| path.rfind('/').map(|idx| &path[..idx]))
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Topic>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    fn topic_mut(&mut self, topic: &str) -> &mut Topic {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
    }

    /// Subscribes a client to a topic, creating the topic if needed.
    ///
    /// Returns the replay of the retained value for this subscriber when the
    /// topic has one.
    pub fn subscribe(
        &mut self,
        topic: &str,
        client: ClientId,
        serializer: Serializer,
    ) -> Option<Delivery> {
        let entry = self.topic_mut(topic);
        entry.subscribe(client, serializer);

        if entry.retained.is_empty() {
            return None;
        }

        // a repeated subscribe keeps the serializer of the first one
        let serializer = entry
            .subscribers
            .iter()
            .find(|s| s.client == client)
            .map_or(serializer, |s| s.serializer);

        Some(Delivery {
            client,
            serializer,
            message: Message::publish(topic, entry.retained.as_str()),
        })
    }

    /// Removes the client from exactly this topic. Unknown topics and
    /// non-subscribers are a no-op.
    pub fn unsubscribe(&mut self, topic: &str, client: &ClientId) -> bool {
        self.topics
            .get_mut(topic)
            .is_some_and(|t| t.unsubscribe(client))
    }

    /// Removes the client from every topic. Returns how many subscriptions
    /// were dropped.
    pub fn unsubscribe_all(&mut self, client: &ClientId) -> usize {
        self.topics
            .values_mut()
            .map(|t| t.unsubscribe(client))
            .filter(|removed| *removed)
            .count()
    }

    /// Stores `value` as the retained value of `topic` and fans it out to the
    /// subscribers of `topic` and of each of its ancestors.
    ///
    /// Each delivery carries the path at which the subscriber matched.
    /// Ancestors' retained values are left untouched.
    pub fn publish(&mut self, topic: &str, value: &str) -> Vec<Delivery> {
        self.topic_mut(topic).retained = value.to_string();

        let mut deliveries = Vec::new();
        for path in ancestors(topic) {
            let Some(entry) = self.topics.get(path) else {
                continue;
            };
            deliveries.extend(entry.subscribers.iter().map(|s| Delivery {
                client: s.client,
                serializer: s.serializer,
                message: Message::publish(path, value),
            }));
        }
        deliveries
    }

    /// Every path ever subscribed to or published to, in no particular order.
    pub fn list_topics(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }

    /// The retained value of a known topic (empty if nothing was published
    /// there yet), or `None` for a topic the registry has never seen.
    pub fn get_retained(&self, topic: &str) -> Option<&str> {
        self.topics.get(topic).map(|t| t.retained.as_str())
    }

    /// Current subscribers of `topic`, in subscription order. Empty for an
    /// unknown topic.
    pub fn subscribers(&self, topic: &str) -> &[Subscriber] {
        self.topics
            .get(topic)
            .map(|t| t.subscribers.as_slice())
            .unwrap_or_default()
    }

    /// Number of known topics.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Returns `true` if no topic was ever subscribed to or published to.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
