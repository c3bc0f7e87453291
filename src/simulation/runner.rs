//! Run a configured simulation end to end and summarize it.
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use super::cluster::AsyncCluster;
use super::cycle::{CycleSimulation, DeliveryStats};
use super::observer::OverlayStats;
use crate::error::Result;
use crate::gossip::ShuffleStats;
use crate::settings::{RunMode, Settings};
use crate::transport::NetworkStatsSnapshot;

#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub run_mode: RunMode,
    pub nodes: usize,
    pub rounds: u64,
    pub cache_size: usize,
    pub shuffle_length: usize,
    pub overlay: OverlayStats,
    pub protocol: ShuffleStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkStatsSnapshot>,
}

impl SimulationReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} run: {} nodes, {} rounds, N={} L={}",
            self.run_mode, self.nodes, self.rounds, self.cache_size, self.shuffle_length
        )?;
        writeln!(f, "overlay: {}", self.overlay)?;
        write!(
            f,
            "protocol: rounds={} replies={} rejects={} timeouts={} added={} replaced={} dropped={}",
            self.protocol.rounds_started,
            self.protocol.replies_received,
            self.protocol.rejects_received,
            self.protocol.timed_out_rounds,
            self.protocol.entries_added,
            self.protocol.entries_replaced,
            self.protocol.entries_dropped
        )
    }
}

fn should_report(settings: &Settings, round: u64) -> bool {
    settings.report_every > 0 && round % settings.report_every == 0
}

pub fn run_cycle_simulation(settings: &Settings) -> Result<SimulationReport> {
    let mut sim = CycleSimulation::from_settings(settings)?;
    info!("[round 0] {}", sim.overlay_stats());
    for round in 1..=settings.rounds {
        sim.run_cycle();
        if should_report(settings, round) {
            info!("[round {}] {}", round, sim.overlay_stats());
        }
    }
    Ok(SimulationReport {
        run_mode: RunMode::Cycle,
        nodes: settings.node_count,
        rounds: settings.rounds,
        cache_size: settings.cache_size,
        shuffle_length: settings.shuffle_length,
        overlay: sim.overlay_stats(),
        protocol: sim.shuffle_stats(),
        delivery: Some(sim.delivery_stats()),
        network: None,
    })
}

pub async fn run_async_cluster(settings: &Settings) -> Result<SimulationReport> {
    let cluster = AsyncCluster::start(settings)?;
    let interval = cluster.round_interval();
    info!("[round 0] {}", cluster.overlay_stats().await?);

    let mut timer = tokio::time::interval(interval);
    timer.tick().await;
    for round in 1..=settings.rounds {
        timer.tick().await;
        if should_report(settings, round) {
            info!("[round {}] {}", round, cluster.overlay_stats().await?);
        }
    }
    // let in-flight exchanges settle before the snapshot
    tokio::time::sleep(interval.min(Duration::from_millis(100))).await;

    let nodes = cluster.node_count();
    let overlay = cluster.overlay_stats().await?;
    let network = cluster.network_stats();
    let protocol = cluster.shutdown().await?;
    Ok(SimulationReport {
        run_mode: RunMode::Async,
        nodes,
        rounds: settings.rounds,
        cache_size: settings.cache_size,
        shuffle_length: settings.shuffle_length,
        overlay,
        protocol,
        delivery: None,
        network: Some(network),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_report() {
        let settings = Settings {
            node_count: 40,
            cache_size: 6,
            shuffle_length: 3,
            rounds: 10,
            report_every: 5,
            ..Settings::default()
        };
        let report = run_cycle_simulation(&settings).unwrap();
        assert_eq!(report.nodes, 40);
        assert_eq!(report.protocol.rounds_started, 400);
        assert!(report.delivery.is_some());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["run_mode"], "Cycle");
        assert!(json.get("network").is_none());
        assert!(report.to_string().contains("40 nodes"));
    }

    #[tokio::test]
    async fn test_async_report() {
        let settings = Settings {
            node_count: 8,
            cache_size: 4,
            shuffle_length: 2,
            bootstrap_degree: 2,
            rounds: 4,
            round_interval_ms: 5,
            report_every: 0,
            run_mode: RunMode::Async,
            ..Settings::default()
        };
        let report = run_async_cluster(&settings).await.unwrap();
        assert_eq!(report.overlay.nodes, 8);
        assert!(report.network.is_some());
        assert!(report.delivery.is_none());
    }
}
