//! CLI for this application
//!
use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
#[clap(name = settings::APP_NAME, version = settings::APP_VERSION)]
pub struct Cli {
    // Number of simulated nodes
    #[clap(
        long,
        default_value = "1000",
        env("PEERSHUFFLE_NODES"),
        help = "Number of nodes in the simulated overlay"
    )]
    pub nodes: usize,

    // Protocol: maximum cache size (N)
    #[clap(
        long,
        default_value = settings::DEFAULT_CACHE_SIZE,
        env("PEERSHUFFLE_CACHE_SIZE"),
        help = "Maximum number of neighbors each node keeps"
    )]
    pub cache_size: usize,

    // Protocol: maximum entries offered per exchange (L)
    #[clap(
        long,
        default_value = settings::DEFAULT_SHUFFLE_LENGTH,
        env("PEERSHUFFLE_SHUFFLE_LENGTH"),
        help = "Maximum number of entries exchanged per shuffle"
    )]
    pub shuffle_length: usize,

    #[clap(
        long,
        default_value = "0",
        env("PEERSHUFFLE_REPLY_TIMEOUT_ROUNDS"),
        help = "Rounds to wait for a shuffle answer before giving up (0 waits forever)"
    )]
    pub reply_timeout_rounds: u32,

    #[clap(
        long,
        default_value = "cycle",
        env("PEERSHUFFLE_RUN_MODE"),
        help = "run-mode: 'cycle' (deterministic) or 'async' (tokio tasks)"
    )]
    pub run_mode: settings::RunMode,

    #[clap(
        long,
        default_value = "100",
        env("PEERSHUFFLE_ROUNDS"),
        help = "Number of shuffle rounds to run"
    )]
    pub rounds: u64,

    #[clap(
        long,
        default_value = "50",
        env("PEERSHUFFLE_ROUND_INTERVAL_MS"),
        help = "Milliseconds between rounds in async mode"
    )]
    pub round_interval_ms: u64,

    #[clap(
        long,
        default_value = "10",
        env("PEERSHUFFLE_REPORT_EVERY"),
        help = "Log overlay statistics every N rounds (0 = only at the end)"
    )]
    pub report_every: u64,

    #[clap(
        long,
        default_value = "3",
        env("PEERSHUFFLE_BOOTSTRAP_DEGREE"),
        help = "Random neighbors each node starts with"
    )]
    pub bootstrap_degree: usize,

    #[clap(
        long,
        default_value = "0.0",
        env("PEERSHUFFLE_LOSS_PROBABILITY"),
        help = "Probability that a single envelope is lost"
    )]
    pub loss_probability: f64,

    #[clap(
        long,
        default_value = "1",
        env("PEERSHUFFLE_SEED"),
        help = "Random seed for cycle mode"
    )]
    pub seed: u64,

    #[clap(long, env("PEERSHUFFLE_JSON"), help = "Print the final report as JSON")]
    pub json: bool,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            node_count: self.nodes,
            cache_size: self.cache_size,
            shuffle_length: self.shuffle_length,
            reply_timeout_rounds: self.reply_timeout_rounds,
            run_mode: self.run_mode,
            rounds: self.rounds,
            round_interval_ms: self.round_interval_ms,
            report_every: self.report_every,
            bootstrap_degree: self.bootstrap_degree,
            loss_probability: self.loss_probability,
            seed: self.seed,
            json: self.json,
        }
    }
}
