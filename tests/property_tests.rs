use std::collections::BTreeSet;

use peershuffle::gossip::{Entry, ShuffleConfig, View};
use peershuffle::node::NodeId;
use peershuffle::settings::Settings;
use peershuffle::simulation::CycleSimulation;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum ViewOp {
    Add(u32),
    Remove(u32),
    ClearMarks,
}

fn view_op() -> impl Strategy<Value = ViewOp> {
    prop_oneof![
        4 => (0u32..30).prop_map(ViewOp::Add),
        2 => (0u32..30).prop_map(ViewOp::Remove),
        1 => Just(ViewOp::ClearMarks),
    ]
}

proptest! {
    #[test]
    fn test_view_invariants_under_random_ops(
        capacity in 1usize..12,
        ops in prop::collection::vec(view_op(), 0..200)
    ) {
        let owner = NodeId::new(0);
        let mut view = View::new(owner, capacity);
        for op in ops {
            match op {
                ViewOp::Add(p) => {
                    let peer = NodeId::new(p);
                    let expected = p != 0 && !view.is_full() && !view.contains(peer);
                    prop_assert_eq!(view.try_add(peer), expected);
                }
                ViewOp::Remove(p) => {
                    let present = view.contains(NodeId::new(p));
                    let removed = view.remove(&Entry::new(NodeId::new(p)));
                    prop_assert_eq!(removed.is_some(), present);
                    prop_assert!(!view.contains(NodeId::new(p)));
                }
                ViewOp::ClearMarks => {
                    view.clear_all_sent_to();
                    prop_assert!(view.iter().all(|e| e.sent_to().is_none()));
                }
            }

            let peers = view.peers();
            let unique: BTreeSet<NodeId> = peers.iter().copied().collect();
            prop_assert!(peers.len() <= capacity);
            prop_assert_eq!(unique.len(), peers.len());
            prop_assert!(!view.contains(owner));
        }
    }

    #[test]
    fn test_try_add_is_idempotent(peer in 1u32..1000, capacity in 1usize..10) {
        let mut view = View::new(NodeId::new(0), capacity);
        prop_assert!(view.try_add(NodeId::new(peer)));
        prop_assert!(!view.try_add(NodeId::new(peer)));
        prop_assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_simulation_views_stay_well_formed(
        node_count in 2usize..40,
        cache_size in 1usize..10,
        shuffle_length in 1usize..12,
        loss in 0.0f64..0.5,
        timeout in 0u32..4,
        seed in any::<u64>(),
        cycles in 1u64..15
    ) {
        let settings = Settings {
            node_count,
            cache_size,
            shuffle_length,
            bootstrap_degree: cache_size.min(node_count - 1).min(3),
            reply_timeout_rounds: timeout,
            loss_probability: loss,
            seed,
            ..Settings::default()
        };
        let mut sim = CycleSimulation::from_settings(&settings).unwrap();
        sim.run(cycles);

        prop_assert_eq!(sim.pending(), 0);
        for node in sim.node_ids() {
            let engine = sim.engine(node).unwrap();
            let peers = engine.neighbors();
            let unique: BTreeSet<NodeId> = peers.iter().copied().collect();
            prop_assert!(peers.len() <= cache_size);
            prop_assert_eq!(unique.len(), peers.len());
            prop_assert!(!peers.contains(&node));
        }

        let stats = sim.shuffle_stats();
        prop_assert!(stats.replies_received + stats.rejects_received <= stats.rounds_started);
    }

    #[test]
    fn test_lossless_rounds_always_complete(
        node_count in 2usize..30,
        cache_size in 1usize..8,
        shuffle_length in 1usize..8,
        seed in any::<u64>()
    ) {
        let config = ShuffleConfig::new(cache_size, shuffle_length).unwrap();
        let mut sim = CycleSimulation::new(config, seed);
        for n in 1..=node_count as u32 {
            sim.add_node(NodeId::new(n)).unwrap();
        }
        for n in 1..=node_count as u32 {
            let next = n % node_count as u32 + 1;
            sim.add_neighbor(NodeId::new(n), NodeId::new(next)).unwrap();
        }
        sim.run(5);

        for node in sim.node_ids() {
            let engine = sim.engine(node).unwrap();
            prop_assert!(!engine.is_waiting());
        }
        let stats = sim.shuffle_stats();
        prop_assert_eq!(stats.rounds_started, stats.replies_received);
        prop_assert_eq!(stats.rejects_received, 0);
    }
}

proptest! {
    #[test]
    fn test_completed_round_leaves_no_markers(
        cache_size in 1usize..10,
        shuffle_length in 1usize..10,
        peers in prop::collection::btree_set(1u32..50, 1..10),
        offered in prop::collection::vec(1u32..80, 0..10),
        rejected in any::<bool>(),
        seed in any::<u64>()
    ) {
        use peershuffle::gossip::{GossipMessage, ShuffleEngine};
        use peershuffle::transport::Outbox;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let config = ShuffleConfig::new(cache_size, shuffle_length).unwrap();
        let outbox = Outbox::new();
        let mut engine =
            ShuffleEngine::new(NodeId::new(0), config, outbox.clone(), StdRng::seed_from_u64(seed));
        for p in peers {
            engine.add_neighbor(NodeId::new(p));
        }
        engine.on_periodic_tick();
        let sent = outbox.drain();
        prop_assert_eq!(sent.len(), 1);
        let q = sent[0].target;

        let answer = if rejected {
            GossipMessage::reject(q)
        } else {
            GossipMessage::reply(q, offered.into_iter().map(|p| Entry::new(NodeId::new(p))).collect())
        };
        engine.on_envelope_received(answer);

        prop_assert!(!engine.is_waiting());
        prop_assert!(engine.view().iter().all(|e| e.sent_to().is_none()));
        prop_assert!(engine.degree() <= cache_size);
        prop_assert!(!engine.contains(NodeId::new(0)));
    }
}
