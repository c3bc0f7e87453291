//! In-process network
//!
//! Routes encoded `GossipPacket`s between nodes running in the same process.
//! Each registered node gets an unbounded tokio channel, so a send never
//! waits on the receiver.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::debug;

use super::traits::Sender;
use crate::error::Result;
use crate::gossip::{GossipMessage, GossipPacket};
use crate::node::NodeId;
use crate::transport_error;

/// Statistics for the in-process network
#[derive(Debug, Default)]
pub struct NetworkStats {
    pub packets_sent: AtomicU64,
    pub packets_dropped: AtomicU64,
    pub send_errors: AtomicU64,
}

/// Point-in-time copy of `NetworkStats`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct NetworkStatsSnapshot {
    pub packets_sent: u64,
    pub packets_dropped: u64,
    pub send_errors: u64,
}

/// Registry of node inboxes
#[derive(Debug)]
pub struct MemoryNetwork {
    inboxes: DashMap<NodeId, mpsc::UnboundedSender<Vec<u8>>>,
    loss_probability: f64,
    stats: NetworkStats,
}

impl MemoryNetwork {
    pub fn new(loss_probability: f64) -> Arc<Self> {
        Arc::new(Self {
            inboxes: DashMap::new(),
            loss_probability,
            stats: NetworkStats::default(),
        })
    }

    /// Register a node and return the receiving end of its inbox.
    ///
    /// Registering the same id again replaces its previous inbox.
    pub fn register(&self, node_id: NodeId) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.insert(node_id, tx);
        rx
    }

    /// Remove a node; later sends to it fail.
    pub fn unregister(&self, node_id: NodeId) {
        self.inboxes.remove(&node_id);
    }

    /// Build a transport handle that sends on behalf of `node_id`
    pub fn transport(self: &Arc<Self>, node_id: NodeId) -> MemoryTransport {
        MemoryTransport {
            node_id,
            network: Arc::clone(self),
        }
    }

    pub fn stats(&self) -> NetworkStatsSnapshot {
        NetworkStatsSnapshot {
            packets_sent: self.stats.packets_sent.load(Ordering::Relaxed),
            packets_dropped: self.stats.packets_dropped.load(Ordering::Relaxed),
            send_errors: self.stats.send_errors.load(Ordering::Relaxed),
        }
    }

    /// Hand already-encoded bytes to `target`'s inbox
    pub fn deliver(&self, from: NodeId, target: NodeId, data: Vec<u8>) -> Result<()> {
        if self.loss_probability > 0.0 && rand::thread_rng().gen_bool(self.loss_probability) {
            self.stats.packets_dropped.fetch_add(1, Ordering::Relaxed);
            debug!("[{}] Dropped packet to {} (simulated loss)", from, target);
            return Ok(());
        }

        let inbox = match self.inboxes.get(&target) {
            Some(inbox) => inbox,
            None => {
                self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
                return Err(transport_error!("Peer not found: {}", target));
            }
        };
        match inbox.send(data) {
            Ok(()) => {
                self.stats.packets_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) => {
                self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
                Err(transport_error!("Inbox closed for peer {}", target))
            }
        }
    }
}

/// Per-node sending handle onto a `MemoryNetwork`
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    node_id: NodeId,
    network: Arc<MemoryNetwork>,
}

impl Sender for MemoryTransport {
    fn send(&self, target: NodeId, message: GossipMessage) -> Result<()> {
        let data = GossipPacket::new(message).serialize()?;
        self.network.deliver(self.node_id, target, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShuffleError;
    use crate::gossip::MessageType;

    #[tokio::test]
    async fn test_send_reaches_registered_inbox() {
        let network = MemoryNetwork::new(0.0);
        let mut inbox = network.register(NodeId::new(2));
        let transport = network.transport(NodeId::new(1));

        transport
            .send(NodeId::new(2), GossipMessage::reject(NodeId::new(1)))
            .unwrap();

        let data = inbox.recv().await.unwrap();
        let packet = GossipPacket::deserialize(&data).unwrap();
        assert_eq!(packet.message.message_type(), MessageType::Reject);
        assert_eq!(packet.message.origin(), NodeId::new(1));
        assert_eq!(network.stats().packets_sent, 1);
    }

    #[tokio::test]
    async fn test_send_to_departed_node_fails() {
        let network = MemoryNetwork::new(0.0);
        let _inbox = network.register(NodeId::new(2));
        network.unregister(NodeId::new(2));
        let transport = network.transport(NodeId::new(1));

        let result = transport.send(NodeId::new(2), GossipMessage::reject(NodeId::new(1)));
        assert!(matches!(result, Err(ShuffleError::Transport(_))));
        assert_eq!(network.stats().send_errors, 1);
        assert_eq!(network.stats().packets_sent, 0);
    }

    #[tokio::test]
    async fn test_total_loss_drops_silently() {
        let network = MemoryNetwork::new(1.0);
        let mut inbox = network.register(NodeId::new(2));
        let transport = network.transport(NodeId::new(1));

        transport
            .send(NodeId::new(2), GossipMessage::reject(NodeId::new(1)))
            .unwrap();
        assert!(inbox.try_recv().is_err());
        assert_eq!(network.stats().packets_dropped, 1);
    }
}
