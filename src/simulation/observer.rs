//! Overlay observer
//!
//! Summarizes the graph formed by every node's view: how evenly nodes are
//! referenced (in-degree) and whether the overlay is still in one piece.
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::node::NodeId;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OverlayStats {
    pub nodes: usize,
    pub mean_view_size: f64,
    pub min_in_degree: usize,
    pub max_in_degree: usize,
    pub mean_in_degree: f64,
    pub in_degree_std_dev: f64,
    /// Nodes no other node knows about
    pub isolated_nodes: usize,
    /// View entries pointing at nodes that are no longer part of the overlay
    pub dead_links: usize,
    /// Weakly connected components among live nodes
    pub components: usize,
}

impl OverlayStats {
    pub fn from_views(views: &BTreeMap<NodeId, Vec<NodeId>>) -> Self {
        let nodes = views.len();
        if nodes == 0 {
            return Self::default();
        }

        let mut in_degree: HashMap<NodeId, usize> = views.keys().map(|&n| (n, 0)).collect();
        let mut dead_links = 0;
        let mut components = Components::new(views.keys().copied());

        for (&node, peers) in views {
            for peer in peers {
                match in_degree.get_mut(peer) {
                    Some(count) => {
                        *count += 1;
                        components.union(node, *peer);
                    }
                    None => dead_links += 1,
                }
            }
        }

        let total_view: usize = views.values().map(|v| v.len()).sum();
        let degrees: Vec<usize> = in_degree.values().copied().collect();
        let mean = degrees.iter().sum::<usize>() as f64 / nodes as f64;
        let variance = degrees
            .iter()
            .map(|&d| (d as f64 - mean).powi(2))
            .sum::<f64>()
            / nodes as f64;

        Self {
            nodes,
            mean_view_size: total_view as f64 / nodes as f64,
            min_in_degree: degrees.iter().copied().min().unwrap_or(0),
            max_in_degree: degrees.iter().copied().max().unwrap_or(0),
            mean_in_degree: mean,
            in_degree_std_dev: variance.sqrt(),
            isolated_nodes: degrees.iter().filter(|&&d| d == 0).count(),
            dead_links,
            components: components.count(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.components <= 1
    }
}

impl std::fmt::Display for OverlayStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nodes={} view={:.2} in-degree min={} max={} mean={:.2} sd={:.2} isolated={} dead_links={} components={}",
            self.nodes,
            self.mean_view_size,
            self.min_in_degree,
            self.max_in_degree,
            self.mean_in_degree,
            self.in_degree_std_dev,
            self.isolated_nodes,
            self.dead_links,
            self.components
        )
    }
}

// union-find over node ids
struct Components {
    parent: HashMap<NodeId, NodeId>,
}

impl Components {
    fn new(nodes: impl Iterator<Item = NodeId>) -> Self {
        Self {
            parent: nodes.map(|n| (n, n)).collect(),
        }
    }

    fn find(&mut self, node: NodeId) -> NodeId {
        let mut root = node;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }
        // path compression
        let mut current = node;
        while current != root {
            let next = self.parent[&current];
            self.parent.insert(current, root);
            current = next;
        }
        root
    }

    fn union(&mut self, a: NodeId, b: NodeId) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }

    fn count(&mut self) -> usize {
        let nodes: Vec<NodeId> = self.parent.keys().copied().collect();
        let mut roots: Vec<NodeId> = nodes.into_iter().map(|n| self.find(n)).collect();
        roots.sort();
        roots.dedup();
        roots.len()
    }
}
