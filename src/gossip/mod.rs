//! Gossip-based peer sampling by cache shuffling.
//!
//! Every node keeps a bounded cache of neighbor entries and periodically
//! exchanges a random part of it with one random neighbor. Repeated rounds
//! keep the overlay formed by all caches connected and evenly loaded.
pub mod entry;
pub mod messages;
pub mod shuffle;
pub mod view;

pub use entry::Entry;
pub use messages::{GossipMessage, GossipPacket, MessageType, PACKET_VERSION};
pub use shuffle::{ShuffleConfig, ShuffleEngine, ShuffleState, ShuffleStats};
pub use view::View;
