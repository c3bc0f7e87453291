pub mod gossip;
pub mod node_id;

pub use gossip::{GossipCommand, GossipController, GossipHandle};
pub use node_id::NodeId;
