use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// An entry in a node's cache.
///
/// Holds the neighbor handle plus a marker naming the peer this entry was
/// last offered to during a shuffle. The marker is a plain handle; it does
/// not keep anything alive. Equality only looks at `peer`.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Decode, Encode)]
pub struct Entry {
    peer: NodeId,
    sent_to: Option<NodeId>,
}

impl Entry {
    pub fn new(peer: NodeId) -> Self {
        Self {
            peer,
            sent_to: None,
        }
    }

    pub fn peer(&self) -> NodeId {
        self.peer
    }

    pub fn sent_to(&self) -> Option<NodeId> {
        self.sent_to
    }

    pub fn set_sent_to(&mut self, target: Option<NodeId>) {
        self.sent_to = target;
    }

    /// A copy safe to hand to another node: same peer, no bookkeeping.
    pub fn fresh_copy(&self) -> Self {
        Self::new(self.peer)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.peer == other.peer
    }
}

impl Eq for Entry {}

impl From<NodeId> for Entry {
    fn from(peer: NodeId) -> Self {
        Entry::new(peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_sent_to() {
        let mut a = Entry::new(NodeId::new(1));
        let b = Entry::new(NodeId::new(1));
        a.set_sent_to(Some(NodeId::new(9)));
        assert_eq!(a, b);
        assert_ne!(a, Entry::new(NodeId::new(2)));
    }

    #[test]
    fn test_fresh_copy_drops_marker() {
        let mut a = Entry::new(NodeId::new(3));
        a.set_sent_to(Some(NodeId::new(4)));
        let copy = a.fresh_copy();
        assert_eq!(copy.peer(), NodeId::new(3));
        assert!(copy.sent_to().is_none());
        assert_eq!(a.sent_to(), Some(NodeId::new(4)));
    }
}
