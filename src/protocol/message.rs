//! Typed command records.
//!
//! `Message` is the closed set of things that travel over the wire. On the wire
//! each record is a flat field map whose `command` field selects the variant.

use std::fmt;

use crate::codec::{FieldValue, Fields};
use crate::utils::{Error, Result};

pub const COMMAND_FIELD: &str = "command";

/// Command tag of a record, as carried in the `command` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Subscribe,
    Publish,
    TopicList,
    TopicListResult,
    Unsubscribe,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Subscribe => "subscribe",
            Command::Publish => "publish",
            Command::TopicList => "topic_list",
            Command::TopicListResult => "topic_list_result",
            Command::Unsubscribe => "unsubscribe",
        }
    }

    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "subscribe" => Ok(Command::Subscribe),
            "publish" => Ok(Command::Publish),
            "topic_list" => Ok(Command::TopicList),
            "topic_list_result" => Ok(Command::TopicListResult),
            "unsubscribe" => Ok(Command::Unsubscribe),
            other => Err(Error::format(format!("unknown command `{other}`"))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Subscribe { topic: String },
    Publish { topic: String, message: String },
    TopicList,
    TopicListResult { topics: Vec<String> },
    Unsubscribe { topic: String },
}

impl Message {
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Message::Subscribe { topic: topic.into() }
    }

    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Message::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }

    pub fn unsubscribe(topic: impl Into<String>) -> Self {
        Message::Unsubscribe { topic: topic.into() }
    }

    pub fn command(&self) -> Command {
        match self {
            Message::Subscribe { .. } => Command::Subscribe,
            Message::Publish { .. } => Command::Publish,
            Message::TopicList => Command::TopicList,
            Message::TopicListResult { .. } => Command::TopicListResult,
            Message::Unsubscribe { .. } => Command::Unsubscribe,
        }
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(COMMAND_FIELD.to_string(), self.command().as_str().into());
        match self {
            Message::Subscribe { topic } | Message::Unsubscribe { topic } => {
                fields.insert("topic".to_string(), topic.as_str().into());
            }
            Message::Publish { topic, message } => {
                fields.insert("topic".to_string(), topic.as_str().into());
                fields.insert("message".to_string(), message.as_str().into());
            }
            Message::TopicList => {}
            Message::TopicListResult { topics } => {
                fields.insert("topics".to_string(), FieldValue::List(topics.clone()));
            }
        }
        fields
    }

    /// Rebuild a record from a decoded field map. Fields other than the ones
    /// the command needs are ignored.
    pub fn from_fields(mut fields: Fields) -> Result<Self> {
        let command = match fields.remove(COMMAND_FIELD) {
            Some(FieldValue::Text(tag)) => Command::parse(&tag)?,
            Some(FieldValue::List(_)) => return Err(Error::format("`command` must be text")),
            None => return Err(Error::format("missing `command` field")),
        };

        let message = match command {
            Command::Subscribe => Message::Subscribe {
                topic: take_text(&mut fields, "topic")?,
            },
            Command::Publish => Message::Publish {
                topic: take_text(&mut fields, "topic")?,
                message: take_text(&mut fields, "message")?,
            },
            Command::TopicList => Message::TopicList,
            Command::TopicListResult => Message::TopicListResult {
                topics: match fields.remove("topics") {
                    Some(FieldValue::List(topics)) => topics,
                    // attribute-flat encodings carry the list as one opaque string
                    Some(FieldValue::Text(flat)) if flat.is_empty() => Vec::new(),
                    Some(FieldValue::Text(flat)) => vec![flat],
                    None => Vec::new(),
                },
            },
            Command::Unsubscribe => Message::Unsubscribe {
                topic: take_text(&mut fields, "topic")?,
            },
        };
        Ok(message)
    }
}

fn take_text(fields: &mut Fields, name: &str) -> Result<String> {
    match fields.remove(name) {
        Some(FieldValue::Text(value)) => Ok(value),
        Some(FieldValue::List(_)) => Err(Error::format(format!("`{name}` must be text"))),
        None => Err(Error::format(format!("missing `{name}` field"))),
    }
}
