//! Transport traits for the shuffle protocol
//!
//! The protocol core only needs one outbound capability: hand an envelope
//! to the transport addressed to a peer. Delivery is the transport's job.
use std::sync::Arc;

use crate::error::Result;
use crate::gossip::GossipMessage;
use crate::node::NodeId;

/// Trait for sending envelopes to peers
///
/// Implementations must not block the caller. Delivery is at-least-once to
/// a live destination with no ordering guarantee; sends to a departed node
/// may fail or vanish silently.
pub trait Sender {
    fn send(&self, target: NodeId, message: GossipMessage) -> Result<()>;
}

impl<T: Sender + ?Sized> Sender for Arc<T> {
    fn send(&self, target: NodeId, message: GossipMessage) -> Result<()> {
        (**self).send(target, message)
    }
}
