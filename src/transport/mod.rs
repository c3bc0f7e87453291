//! Transport Module
//!
//! The `Sender` seam the shuffle engine talks to, plus two implementations:
//! a recording `Outbox` for deterministic drivers and an in-process
//! `MemoryNetwork` that moves encoded packets over tokio channels.
pub mod memory;
pub mod outbox;
pub mod traits;

pub use memory::{MemoryNetwork, MemoryTransport, NetworkStats, NetworkStatsSnapshot};
pub use outbox::{Outbox, OutboxEntry};
pub use traits::Sender;
