//! Deterministic cycle-driven simulation
//!
//! Every node's engine sends into one shared `Outbox`. A cycle visits all
//! live nodes in a seeded random order; each visited node runs its active
//! step and the resulting exchange is delivered to completion before the
//! next node goes. With a fixed seed the whole run is reproducible.
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use super::bootstrap::random_bootstrap;
use super::observer::OverlayStats;
use crate::error::Result;
use crate::gossip::{ShuffleConfig, ShuffleEngine, ShuffleStats};
use crate::node::NodeId;
use crate::node_error;
use crate::settings::Settings;
use crate::transport::{Outbox, OutboxEntry};

pub type SimEngine = ShuffleEngine<Outbox, StdRng>;

/// What happened to envelopes handed to the simulated network
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub delivered: u64,
    pub lost: u64,
    /// Addressed to nodes that have left
    pub undeliverable: u64,
}

pub struct CycleSimulation {
    config: ShuffleConfig,
    engines: BTreeMap<NodeId, SimEngine>,
    outbox: Outbox,
    rng: StdRng,
    loss_probability: f64,
    cycle: u64,
    delivery: DeliveryStats,
}

impl std::fmt::Debug for CycleSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleSimulation")
            .field("nodes", &self.engines.len())
            .field("cycle", &self.cycle)
            .field("pending", &self.outbox.len())
            .field("delivery", &self.delivery)
            .finish()
    }
}

impl CycleSimulation {
    pub fn new(config: ShuffleConfig, seed: u64) -> Self {
        Self {
            config,
            engines: BTreeMap::new(),
            outbox: Outbox::new(),
            rng: StdRng::seed_from_u64(seed),
            loss_probability: 0.0,
            cycle: 0,
            delivery: DeliveryStats::default(),
        }
    }

    /// Drop each envelope independently with probability `p` (clamped to [0, 1])
    pub fn with_loss_probability(mut self, p: f64) -> Self {
        self.loss_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Nodes `1..=node_count`, wired with random k-out bootstrap views
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let mut sim = Self::new(settings.shuffle_config()?, settings.seed)
            .with_loss_probability(settings.loss_probability);
        let ids: Vec<NodeId> = (1..=settings.node_count as u32).map(NodeId::new).collect();
        for &node in &ids {
            sim.add_node(node)?;
        }
        for (node, peers) in random_bootstrap(&ids, settings.bootstrap_degree, &mut sim.rng) {
            for peer in peers {
                sim.add_neighbor(node, peer)?;
            }
        }
        info!(
            "Cycle simulation ready: {} nodes, cache size {}, shuffle length {}, seed {}",
            ids.len(),
            settings.cache_size,
            settings.shuffle_length,
            settings.seed
        );
        Ok(sim)
    }

    pub fn add_node(&mut self, node: NodeId) -> Result<()> {
        if self.engines.contains_key(&node) {
            return Err(node_error!("Node {} already exists", node));
        }
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let engine = ShuffleEngine::new(node, self.config.clone(), self.outbox.clone(), rng);
        self.engines.insert(node, engine);
        Ok(())
    }

    /// Seed `node`'s view with `peer`; false if the view refused it
    pub fn add_neighbor(&mut self, node: NodeId, peer: NodeId) -> Result<bool> {
        self.engines
            .get_mut(&node)
            .map(|engine| engine.add_neighbor(peer))
            .ok_or_else(|| node_error!("Unknown node {}", node))
    }

    /// Take a node out of the overlay; envelopes to it are lost from now on
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        self.engines.remove(&node).is_some()
    }

    pub fn engine(&self, node: NodeId) -> Option<&SimEngine> {
        self.engines.get(&node)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.engines.keys().copied().collect()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Run one node's active step without delivering anything
    pub fn tick(&mut self, node: NodeId) -> Result<()> {
        self.engines
            .get_mut(&node)
            .map(|engine| engine.on_periodic_tick())
            .ok_or_else(|| node_error!("Unknown node {}", node))
    }

    /// Deliver the oldest pending envelope, returning it
    pub fn deliver_next(&mut self) -> Option<OutboxEntry> {
        let entry = self.outbox.pop()?;
        if self.loss_probability > 0.0 && self.rng.gen_bool(self.loss_probability) {
            self.delivery.lost += 1;
            debug!(
                "Lost {} from {} to {}",
                entry.message.message_type(),
                entry.message.origin(),
                entry.target
            );
            return Some(entry);
        }
        match self.engines.get_mut(&entry.target) {
            Some(engine) => {
                engine.on_envelope_received(entry.message.clone());
                self.delivery.delivered += 1;
            }
            None => self.delivery.undeliverable += 1,
        }
        Some(entry)
    }

    /// Deliver until nothing is pending; returns how many envelopes were handled
    pub fn deliver_all(&mut self) -> usize {
        let mut handled = 0;
        while self.deliver_next().is_some() {
            handled += 1;
        }
        handled
    }

    /// Throw away everything in flight, as if the network lost it
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.outbox.drain().len();
        self.delivery.lost += dropped as u64;
        dropped
    }

    /// One round: every live node ticks once, in random order
    pub fn run_cycle(&mut self) {
        let mut order = self.node_ids();
        order.shuffle(&mut self.rng);
        for node in order {
            if let Some(engine) = self.engines.get_mut(&node) {
                engine.on_periodic_tick();
            }
            self.deliver_all();
        }
        self.cycle += 1;
    }

    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.run_cycle();
        }
    }

    pub fn views(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        self.engines
            .iter()
            .map(|(&node, engine)| (node, engine.neighbors()))
            .collect()
    }

    pub fn overlay_stats(&self) -> OverlayStats {
        OverlayStats::from_views(&self.views())
    }

    /// Protocol counters summed over all live nodes
    pub fn shuffle_stats(&self) -> ShuffleStats {
        let mut total = ShuffleStats::default();
        for engine in self.engines.values() {
            total.accumulate(&engine.stats());
        }
        total
    }

    pub fn delivery_stats(&self) -> DeliveryStats {
        self.delivery
    }
}
