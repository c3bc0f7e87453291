use peershuffle::gossip::{Entry, GossipMessage, ShuffleConfig, ShuffleEngine};
use peershuffle::node::NodeId;
use peershuffle::settings::Settings;
use peershuffle::simulation::CycleSimulation;
use peershuffle::transport::Outbox;
use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

fn benchmark_run_cycle(c: &mut Criterion) {
    let settings = Settings {
        node_count: 1000,
        cache_size: 20,
        shuffle_length: 8,
        ..Settings::default()
    };
    let mut sim = CycleSimulation::from_settings(&settings).unwrap();
    // fill the views before measuring
    sim.run(10);

    c.bench_function("run_cycle_1000_nodes", |b| {
        b.iter(|| {
            sim.run_cycle();
            black_box(sim.cycle())
        })
    });
}

fn benchmark_passive_request(c: &mut Criterion) {
    let config = ShuffleConfig::new(20, 8).unwrap();
    let outbox = Outbox::new();
    let mut engine = ShuffleEngine::new(
        NodeId::new(0),
        config,
        outbox.clone(),
        StdRng::seed_from_u64(1),
    );
    for n in 1..=20 {
        engine.add_neighbor(NodeId::new(n));
    }
    let offered: Vec<Entry> = (100..107).map(|n| Entry::new(NodeId::new(n))).collect();

    c.bench_function("passive_request", |b| {
        let mut counter = 1000u32;
        b.iter(|| {
            counter += 1;
            engine.on_envelope_received(GossipMessage::request(
                NodeId::new(counter),
                offered.clone(),
            ));
            black_box(outbox.drain())
        })
    });
}

criterion_group!(benches, benchmark_run_cycle, benchmark_passive_request);
criterion_main!(benches);
