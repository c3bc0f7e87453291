//! Drivers that host many shuffle engines in one process.
//!
//! - `CycleSimulation`: seeded, single-threaded, round by round
//! - `AsyncCluster`: one tokio task per node over an in-process network
//!
//! Both report the resulting overlay through `OverlayStats`.
pub mod bootstrap;
pub mod cluster;
pub mod cycle;
pub mod observer;
pub mod runner;

pub use bootstrap::random_bootstrap;
pub use cluster::AsyncCluster;
pub use cycle::{CycleSimulation, DeliveryStats, SimEngine};
pub use observer::OverlayStats;
pub use runner::{run_async_cluster, run_cycle_simulation, SimulationReport};
