//! Wire protocol: typed records and the length-prefixed frames that carry them.

pub mod frame;
pub mod message;

pub use frame::{
    CloseReason, Inbound, close_frame, decode_payload, encode_frame, read_frame, send,
    send_close, send_message, write_frame,
};
pub use message::{Command, Message};

#[cfg(test)]
mod tests;
