//! Framing
//!
//! ```text
//! +----------------+--------------------+----------------------+
//! | length: u16 BE | serializer: u16 BE | body: [u8; length-2] |
//! +----------------+--------------------+----------------------+
//! ```
//!
//! `length` counts the serializer tag plus the body. A frame whose length is
//! `0` is the close sentinel and carries nothing else.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::message::{Command, Message};
use crate::codec::Serializer;
use crate::utils::{Error, Result};

pub const LENGTH_LEN: usize = 2;
pub const SERIALIZER_LEN: usize = 2;
/// Largest body that still fits in a frame.
pub const MAX_BODY_LEN: usize = u16::MAX as usize - SERIALIZER_LEN;

/// Why a peer's stream ended without a protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer sent an explicit zero-length frame.
    Sentinel,
    /// The transport reported end-of-stream on a frame boundary.
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message {
        serializer: Serializer,
        message: Message,
    },
    Closed(CloseReason),
}

/// Encode `message` with `serializer` into one complete frame.
pub fn encode_frame(message: &Message, serializer: Serializer) -> Result<Vec<u8>> {
    let body = serializer.codec().encode(&message.to_fields())?;
    if body.len() > MAX_BODY_LEN {
        return Err(Error::format(format!(
            "{} body of {} bytes exceeds the {MAX_BODY_LEN} byte frame limit",
            message.command(),
            body.len()
        )));
    }

    let length = (SERIALIZER_LEN + body.len()) as u16;
    let mut frame = Vec::with_capacity(LENGTH_LEN + length as usize);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&serializer.tag().to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode the part of a frame that follows the length prefix.
pub fn decode_payload(payload: &[u8]) -> Result<(Serializer, Message)> {
    if payload.len() < SERIALIZER_LEN {
        return Err(Error::format("frame too short for a serializer tag"));
    }
    let tag = u16::from_be_bytes([payload[0], payload[1]]);
    let serializer = Serializer::try_from(tag)?;
    let fields = serializer.codec().decode(&payload[SERIALIZER_LEN..])?;
    Ok((serializer, Message::from_fields(fields)?))
}

/// The zero-length close sentinel.
pub fn close_frame() -> [u8; LENGTH_LEN] {
    0u16.to_be_bytes()
}

/// Write an already encoded frame in a single `write_all`.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn send_message<W>(writer: &mut W, message: &Message, serializer: Serializer) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message, serializer)?;
    write_frame(writer, &frame).await
}

/// Command-driven send: build the record for `command` from `topic` and
/// `payload`, then frame and write it.
///
/// `payload` is the published value for `Publish`. For `TopicListResult` it is
/// a newline separated list of topics. Other commands ignore it.
pub async fn send<W>(
    writer: &mut W,
    command: Command,
    serializer: Serializer,
    topic: &str,
    payload: Option<&str>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let message = match command {
        Command::Subscribe => Message::subscribe(topic),
        Command::Publish => Message::publish(topic, payload.unwrap_or_default()),
        Command::TopicList => Message::TopicList,
        Command::TopicListResult => Message::TopicListResult {
            topics: payload
                .map(|p| p.lines().map(str::to_string).collect())
                .unwrap_or_default(),
        },
        Command::Unsubscribe => Message::unsubscribe(topic),
    };
    send_message(writer, &message, serializer).await
}

pub async fn send_close<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, &close_frame()).await
}

/// Read exactly one frame.
///
/// Every read loops until the requested byte count has arrived. A stream that
/// ends before the first length byte is an orderly `EndOfStream`; one that
/// ends anywhere else inside a frame is a protocol error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Inbound>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; LENGTH_LEN];
    let first = reader.read(&mut header).await?;
    if first == 0 {
        return Ok(Inbound::Closed(CloseReason::EndOfStream));
    }
    if first < LENGTH_LEN {
        read_exact_or_truncated(reader, &mut header[first..]).await?;
    }

    let length = u16::from_be_bytes(header) as usize;
    if length == 0 {
        return Ok(Inbound::Closed(CloseReason::Sentinel));
    }
    if length < SERIALIZER_LEN {
        return Err(Error::format(format!(
            "frame length {length} cannot hold a serializer tag"
        )));
    }

    let mut payload = vec![0u8; length];
    read_exact_or_truncated(reader, &mut payload).await?;

    let (serializer, message) = decode_payload(&payload)?;
    Ok(Inbound::Message {
        serializer,
        message,
    })
}

async fn read_exact_or_truncated<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::format("stream ended in the middle of a frame"))
        }
        Err(e) => Err(e.into()),
    }
}
