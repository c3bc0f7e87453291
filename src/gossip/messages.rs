//! Shuffle Message Protocol
//!
//! A `GossipMessage` is the envelope exchanged during one shuffle round.
//! Envelopes are built fresh for every step and never mutated after send.
//!
//! When envelopes cross a byte-oriented transport they are wrapped in a
//! `GossipPacket` and encoded with bincode.
use bincode::{Decode, Encode};

use super::entry::Entry;
use crate::error::{GossipError, Result};
use crate::node::NodeId;

/// Current wire format version for `GossipPacket`
pub const PACKET_VERSION: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode, Encode)]
pub enum MessageType {
    /// Initiator offers a subset and asks for one back
    Request,
    /// Responder's subset in answer to a request
    Reply,
    /// Responder is busy with its own round
    Reject,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Request => write!(f, "request"),
            MessageType::Reply => write!(f, "reply"),
            MessageType::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Decode, Encode)]
pub struct GossipMessage {
    message_type: MessageType,
    origin: NodeId,
    offered: Vec<Entry>,
}

impl GossipMessage {
    pub fn request(origin: NodeId, offered: Vec<Entry>) -> Self {
        Self {
            message_type: MessageType::Request,
            origin,
            offered,
        }
    }

    pub fn reply(origin: NodeId, offered: Vec<Entry>) -> Self {
        Self {
            message_type: MessageType::Reply,
            origin,
            offered,
        }
    }

    pub fn reject(origin: NodeId) -> Self {
        Self {
            message_type: MessageType::Reject,
            origin,
            offered: Vec::new(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn offered(&self) -> &[Entry] {
        &self.offered
    }

    pub fn offered_peers(&self) -> Vec<NodeId> {
        self.offered.iter().map(|e| e.peer()).collect()
    }
}

/// GossipPacket wraps messages for network transmission
#[derive(Debug, Clone, Decode, Encode)]
pub struct GossipPacket {
    pub version: u8,
    pub packet_id: u64,
    pub message: GossipMessage,
}

impl GossipPacket {
    /// Create a new gossip packet
    pub fn new(message: GossipMessage) -> Self {
        Self {
            version: PACKET_VERSION,
            packet_id: rand::random(),
            message,
        }
    }

    /// Create a new gossip packet with specific ID
    pub fn new_with_id(message: GossipMessage, packet_id: u64) -> Self {
        Self {
            version: PACKET_VERSION,
            packet_id,
            message,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let config = bincode::config::standard().with_big_endian();
        Ok(bincode::encode_to_vec(self, config)?)
    }

    /// Decode a packet; rejects unknown versions and unknown message types
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let config = bincode::config::standard().with_big_endian();
        let (packet, _): (GossipPacket, usize) = bincode::decode_from_slice(data, config)?;
        if packet.version != PACKET_VERSION {
            return Err(GossipError::Version(packet.version).into());
        }
        Ok(packet)
    }
}
