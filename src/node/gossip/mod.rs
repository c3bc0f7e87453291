//! Async hosting for a shuffle engine.
//!
//! A `GossipController` runs one node inside a single tokio task: it owns
//! the engine outright, fires the active step on a timer and feeds inbound
//! packets to the passive step.
pub mod controller;
pub mod messages;

pub use controller::{GossipController, GossipHandle};
pub use messages::GossipCommand;
