//! Client-side queues.
//!
//! A `Queue` is one TCP connection to the broker bound to one topic and one
//! serializer. Consumers subscribe on connect and `pull` deliveries; producers
//! `push` values to the topic.

use std::collections::VecDeque;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::codec::Serializer;
use crate::protocol::{Inbound, Message, read_frame, send_close, send_message};
use crate::utils::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRole {
    Consumer,
    Producer,
}

/// A value delivered for a topic. `topic` is the path the subscription
/// matched at, which is an ancestor of the published path for hierarchical
/// deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub topic: String,
    pub value: String,
}

pub struct Queue {
    topic: String,
    role: QueueRole,
    serializer: Serializer,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    pending: VecDeque<Received>,
}

impl Queue {
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        topic: impl Into<String>,
        role: QueueRole,
        serializer: Serializer,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let mut queue = Self {
            topic: topic.into(),
            role,
            serializer,
            reader: BufReader::new(read_half),
            writer: write_half,
            pending: VecDeque::new(),
        };

        if role == QueueRole::Consumer {
            let subscribe = Message::subscribe(queue.topic.as_str());
            send_message(&mut queue.writer, &subscribe, serializer).await?;
        }
        Ok(queue)
    }

    /// The topic this queue pushes to or consumes from.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether this queue subscribed on connect.
    pub fn role(&self) -> QueueRole {
        self.role
    }

    /// The encoding used for every frame this queue sends.
    pub fn serializer(&self) -> Serializer {
        self.serializer
    }

    /// Publish `value` to this queue's topic.
    pub async fn push(&mut self, value: &str) -> Result<()> {
        let publish = Message::publish(self.topic.as_str(), value);
        send_message(&mut self.writer, &publish, self.serializer).await
    }

    /// Wait for the next delivery. `None` once the broker closed the stream.
    pub async fn pull(&mut self) -> Result<Option<Received>> {
        if let Some(received) = self.pending.pop_front() {
            return Ok(Some(received));
        }
        loop {
            match self.next_message().await? {
                Some(Message::Publish { topic, message }) => {
                    return Ok(Some(Received {
                        topic,
                        value: message,
                    }));
                }
                Some(other) => debug!("ignoring unsolicited {}", other.command()),
                None => return Ok(None),
            }
        }
    }

    /// Ask the broker for every known topic and wait for the answer.
    /// Deliveries that arrive in between are kept for `pull`.
    ///
    /// With `Serializer::Xml` the list arrives flattened into a single
    /// comma-joined entry.
    pub async fn list_topics(&mut self) -> Result<Vec<String>> {
        send_message(&mut self.writer, &Message::TopicList, self.serializer).await?;
        loop {
            match self.next_message().await? {
                Some(Message::TopicListResult { topics }) => return Ok(topics),
                Some(Message::Publish { topic, message }) => self.pending.push_back(Received {
                    topic,
                    value: message,
                }),
                Some(other) => debug!("ignoring unsolicited {}", other.command()),
                None => {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "broker closed the connection before answering",
                    )));
                }
            }
        }
    }

    /// Stop receiving deliveries for this queue's topic.
    pub async fn cancel(&mut self) -> Result<()> {
        let unsubscribe = Message::unsubscribe(self.topic.as_str());
        send_message(&mut self.writer, &unsubscribe, self.serializer).await
    }

    /// Send the close sentinel and shut the write side down.
    pub async fn close(mut self) -> Result<()> {
        send_close(&mut self.writer).await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<Message>> {
        match read_frame(&mut self.reader).await? {
            Inbound::Message { message, .. } => Ok(Some(message)),
            Inbound::Closed(_) => Ok(None),
        }
    }
}
