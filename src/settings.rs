//! peershuffle application settings
use crate::config_error;
use crate::error::Result;
use crate::gossip::ShuffleConfig;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_CACHE_SIZE: &str = "20";
pub const DEFAULT_SHUFFLE_LENGTH: &str = "8";

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum RunMode {
    /// Deterministic cycle-driven simulation
    Cycle,
    /// One tokio task per node with timer-driven rounds
    Async,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Cycle => write!(f, "cycle"),
            RunMode::Async => write!(f, "async"),
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cycle" => Ok(RunMode::Cycle),
            "async" => Ok(RunMode::Async),
            _ => Err(format!("Invalid run-mode: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // Number of simulated nodes
    pub node_count: usize,

    // Protocol: maximum cache size (N)
    pub cache_size: usize,

    // Protocol: maximum entries offered per exchange (L)
    pub shuffle_length: usize,

    // Ticks to wait for a reply before abandoning a round (0 = wait forever)
    pub reply_timeout_rounds: u32,

    // Driver
    pub run_mode: RunMode,
    pub rounds: u64,
    pub round_interval_ms: u64, // async mode only
    pub report_every: u64,      // log overlay stats every N rounds (0 = only at end)

    // Bootstrap: random neighbors each node starts with
    pub bootstrap_degree: usize,

    // Probability that any single envelope is lost in transit
    pub loss_probability: f64,

    // Seed for all randomness in cycle mode
    pub seed: u64,

    // Emit the final report as JSON
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_count: 1000,
            cache_size: 20,
            shuffle_length: 8,
            reply_timeout_rounds: 0,
            run_mode: RunMode::Cycle,
            rounds: 100,
            round_interval_ms: 50,
            report_every: 10,
            bootstrap_degree: 3,
            loss_probability: 0.0,
            seed: 1,
            json: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.node_count < 2 {
            return Err(config_error!(
                "node count must be at least 2, got {}",
                self.node_count
            ));
        }
        if !(0.0..=1.0).contains(&self.loss_probability) {
            return Err(config_error!(
                "loss probability must be within [0, 1], got {}",
                self.loss_probability
            ));
        }
        if self.bootstrap_degree > self.cache_size {
            return Err(config_error!(
                "bootstrap degree {} exceeds cache size {}",
                self.bootstrap_degree,
                self.cache_size
            ));
        }
        if self.run_mode == RunMode::Async && self.round_interval_ms == 0 {
            return Err(config_error!("round interval must be positive in async mode"));
        }
        self.shuffle_config().map(|_| ())
    }

    pub fn shuffle_config(&self) -> Result<ShuffleConfig> {
        Ok(ShuffleConfig::new(self.cache_size, self.shuffle_length)?
            .with_reply_timeout(self.reply_timeout_rounds))
    }
}
