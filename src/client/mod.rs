//! The `client` module defines how the broker represents a connected peer.
//!
//! A `Client` pairs a `ClientId` with the bounded channel that feeds the
//! connection's writer task.

pub mod pubsub_client;
pub use pubsub_client::{Client, ClientId, Enqueue};
