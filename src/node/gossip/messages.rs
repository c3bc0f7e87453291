//! Commands accepted by a running `GossipController`.
use tokio::sync::oneshot;

use crate::gossip::ShuffleStats;
use crate::node::NodeId;

#[derive(Debug)]
pub enum GossipCommand {
    /// Run one active step now
    Tick,
    /// Current neighbors, in cache order
    GetView {
        resp_chan: oneshot::Sender<Vec<NodeId>>,
    },
    GetStats {
        resp_chan: oneshot::Sender<ShuffleStats>,
    },
    /// Stop the IO loop
    Shutdown,
}
