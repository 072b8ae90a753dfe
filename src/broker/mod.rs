//! The broker: topic bookkeeping, hierarchical fan-out and command dispatch.

pub mod engine;
pub mod registry;
pub mod topic;

pub use engine::{Broker, SharedBroker, lock};
pub use registry::{Delivery, TopicRegistry, ancestors};
