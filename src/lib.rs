//! # topicast
//!
//! `topicast` is an in-memory, topic-based publish/subscribe broker speaking a
//! small length-prefixed binary protocol over TCP.
//!
//! Topics are `/`-delimited paths. A value published to `a/b/c` is retained on
//! `a/b/c` and delivered to the subscribers of `a/b/c`, `a/b` and `a`. New
//! subscribers immediately receive the retained value of the topic they join.
//!
//! ## Core Modules
//!
//! - `broker`: topic registry, hierarchical fan-out and command dispatch.
//! - `client`: the broker's view of a connected peer.
//! - `codec`: the pluggable body encodings (JSON, attribute-flat XML, native).
//! - `config`: loading server configuration.
//! - `protocol`: typed commands and frame encoding/decoding.
//! - `queue`: async consumer/producer client.
//! - `transport`: TCP listener and per-connection driver.
//! - `utils`: error type and logging.

#![deny(clippy::wildcard_enum_match_arm)]

pub mod broker;
pub mod client;
pub mod codec;
pub mod config;
pub mod protocol;
pub mod queue;
pub mod transport;
pub mod utils;
