//! Async in-process cluster
//!
//! Every node runs in its own `GossipController` task, rounds are driven by
//! each controller's timer and envelopes travel as encoded packets over a
//! `MemoryNetwork`. Unlike the cycle driver, interleavings depend on the
//! tokio scheduler, so requests can meet busy nodes and get rejected.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::bootstrap::random_bootstrap;
use super::observer::OverlayStats;
use crate::error::Result;
use crate::gossip::{ShuffleEngine, ShuffleStats};
use crate::node::{GossipController, GossipHandle, NodeId};
use crate::node_error;
use crate::settings::Settings;
use crate::transport::{MemoryNetwork, NetworkStatsSnapshot};

#[derive(Debug)]
pub struct AsyncCluster {
    network: Arc<MemoryNetwork>,
    handles: BTreeMap<NodeId, GossipHandle>,
    round_interval: Duration,
}

impl AsyncCluster {
    /// Spawn one controller per node. Must be called inside a tokio runtime.
    pub fn start(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let config = settings.shuffle_config()?;
        let round_interval = Duration::from_millis(settings.round_interval_ms);
        let network = MemoryNetwork::new(settings.loss_probability);
        let mut rng = StdRng::seed_from_u64(settings.seed);

        let ids: Vec<NodeId> = (1..=settings.node_count as u32).map(NodeId::new).collect();
        let mut handles = BTreeMap::new();
        for (node, peers) in random_bootstrap(&ids, settings.bootstrap_degree, &mut rng) {
            let mut engine = ShuffleEngine::new(
                node,
                config.clone(),
                network.transport(node),
                StdRng::seed_from_u64(rng.gen()),
            );
            for peer in peers {
                engine.add_neighbor(peer);
            }
            let inbox = network.register(node);
            let handle = GossipController::new(engine, Some(round_interval)).spawn(inbox);
            handles.insert(node, handle);
        }

        info!(
            "Async cluster started: {} nodes, round interval {}ms",
            handles.len(),
            settings.round_interval_ms
        );
        Ok(Self {
            network,
            handles,
            round_interval,
        })
    }

    pub fn round_interval(&self) -> Duration {
        self.round_interval
    }

    pub fn node_count(&self) -> usize {
        self.handles.len()
    }

    pub async fn views(&self) -> Result<BTreeMap<NodeId, Vec<NodeId>>> {
        let mut views = BTreeMap::new();
        for (&node, handle) in &self.handles {
            views.insert(node, handle.view().await?);
        }
        Ok(views)
    }

    pub async fn overlay_stats(&self) -> Result<OverlayStats> {
        Ok(OverlayStats::from_views(&self.views().await?))
    }

    pub async fn shuffle_stats(&self) -> Result<ShuffleStats> {
        let mut total = ShuffleStats::default();
        for handle in self.handles.values() {
            total.accumulate(&handle.stats().await?);
        }
        Ok(total)
    }

    pub fn network_stats(&self) -> NetworkStatsSnapshot {
        self.network.stats()
    }

    /// Stop a node and detach it from the network
    pub async fn remove_node(&mut self, node: NodeId) -> Result<ShuffleStats> {
        let handle = self
            .handles
            .remove(&node)
            .ok_or_else(|| node_error!("Unknown node {}", node))?;
        self.network.unregister(node);
        handle.shutdown().await
    }

    /// Stop every node and return the summed final counters
    pub async fn shutdown(self) -> Result<ShuffleStats> {
        let mut total = ShuffleStats::default();
        for (node, handle) in self.handles {
            self.network.unregister(node);
            total.accumulate(&handle.shutdown().await?);
        }
        info!("Async cluster stopped");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            node_count: 12,
            cache_size: 4,
            shuffle_length: 2,
            bootstrap_degree: 2,
            round_interval_ms: 5,
            reply_timeout_rounds: 3,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_cluster_runs_rounds() {
        let cluster = AsyncCluster::start(&settings()).unwrap();
        assert_eq!(cluster.node_count(), 12);
        tokio::time::sleep(Duration::from_millis(60)).await;

        let stats = cluster.shuffle_stats().await.unwrap();
        assert!(stats.rounds_started > 0);

        let overlay = cluster.overlay_stats().await.unwrap();
        assert_eq!(overlay.nodes, 12);
        assert!(overlay.mean_view_size <= 4.0);

        let total = cluster.shutdown().await.unwrap();
        assert!(total.rounds_started >= stats.rounds_started);
    }

    #[tokio::test]
    async fn test_remove_node() {
        let mut cluster = AsyncCluster::start(&settings()).unwrap();
        cluster.remove_node(NodeId::new(1)).await.unwrap();
        assert_eq!(cluster.node_count(), 11);
        assert!(cluster.remove_node(NodeId::new(1)).await.is_err());
        cluster.shutdown().await.unwrap();
    }
}
