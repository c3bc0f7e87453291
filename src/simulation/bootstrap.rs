use rand::seq::SliceRandom;
use rand::Rng;

use crate::node::NodeId;

/// Random k-out wiring: every node gets up to `degree` distinct other nodes.
pub fn random_bootstrap<R: Rng + ?Sized>(
    ids: &[NodeId],
    degree: usize,
    rng: &mut R,
) -> Vec<(NodeId, Vec<NodeId>)> {
    ids.iter()
        .map(|&node| {
            let others: Vec<NodeId> = ids.iter().copied().filter(|&p| p != node).collect();
            let peers = others.choose_multiple(rng, degree).copied().collect();
            (node, peers)
        })
        .collect()
}
