use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Opaque handle for a node in the overlay.
///
/// The protocol only stores and compares handles; it never creates or
/// destroys the node behind one.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Serialize,
    Decode,
    Encode,
    PartialEq,
    PartialOrd,
    Ord,
    Eq,
    Hash,
)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_value() {
        assert_eq!(NodeId::new(7), NodeId::from(7));
        assert_ne!(NodeId::new(7), NodeId::new(8));
        assert!(NodeId::new(1) < NodeId::new(2));
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId::new(42).to_string(), "42");
        assert_eq!(NodeId::new(42).value(), 42);
    }
}
