//! The `transport` module accepts TCP connections and drives each one:
//! frames read from the socket go to the broker, frames the broker queues for
//! a client are written back by that connection's writer task.

pub mod connection;
pub mod server;

pub use connection::{CloseCause, ConnectionState, handle_connection};
pub use server::Server;
