//! Codec registry
//!
//! Every frame body is a flat mapping of field names to values. A `Codec`
//! turns that mapping into bytes and back; which codec applies is decided by
//! the frame's serializer tag.
//!
//! - `Serializer::Json` (0): JSON object, lossless.
//! - `Serializer::Xml` (1): attributes of a single `<message/>` element. List
//!   values are flattened into one attribute and come back as text.
//! - `Serializer::Native` (2): `bincode`, lossless but only understood by
//!   peers running this implementation.

mod json;
mod native;
mod xml;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::{Error, Result};

pub use json::JsonCodec;
pub use native::NativeCodec;
pub use xml::XmlCodec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Field name to value. Ordered so encodings are deterministic.
pub type Fields = BTreeMap<String, FieldValue>;

pub trait Codec: Send + Sync {
    fn encode(&self, fields: &Fields) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<Fields>;
}

/// Wire identifier of a codec, carried as a big-endian `u16` in every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Serializer {
    Json = 0,
    Xml = 1,
    Native = 2,
}

static JSON: JsonCodec = JsonCodec;
static XML: XmlCodec = XmlCodec;
static NATIVE: NativeCodec = NativeCodec;

impl Serializer {
    pub const ALL: [Serializer; 3] = [Serializer::Json, Serializer::Xml, Serializer::Native];

    pub fn tag(self) -> u16 {
        self as u16
    }

    pub fn codec(self) -> &'static dyn Codec {
        match self {
            Serializer::Json => &JSON,
            Serializer::Xml => &XML,
            Serializer::Native => &NATIVE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Serializer::Json => "json",
            Serializer::Xml => "xml",
            Serializer::Native => "native",
        }
    }
}

impl TryFrom<u16> for Serializer {
    type Error = Error;

    fn try_from(tag: u16) -> Result<Self> {
        match tag {
            0 => Ok(Serializer::Json),
            1 => Ok(Serializer::Xml),
            2 => Ok(Serializer::Native),
            other => Err(Error::UnsupportedSerializer(other)),
        }
    }
}

impl FromStr for Serializer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Serializer::Json),
            "xml" => Ok(Serializer::Xml),
            "native" | "bincode" => Ok(Serializer::Native),
            other => Err(format!("unknown serializer `{other}`")),
        }
    }
}

impl fmt::Display for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests;
