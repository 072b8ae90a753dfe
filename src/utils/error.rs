//! The `error` module defines the error type shared by every layer of `topicast`.
//!
//! Protocol problems (`ProtocolFormat`, `UnsupportedSerializer`) are raised at the
//! wire boundary and end the offending connection only. They never bring the
//! broker down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed frame, unknown command tag or a body the codec could not decode.
    #[error("protocol format error: {0}")]
    ProtocolFormat(String),

    /// Serializer tag with no entry in the codec table.
    #[error("unsupported serializer tag {0}")]
    UnsupportedSerializer(u16),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn format(msg: impl Into<String>) -> Self {
        Error::ProtocolFormat(msg.into())
    }

    /// True for errors caused by what the peer sent rather than by the transport.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::ProtocolFormat(_) | Error::UnsupportedSerializer(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
