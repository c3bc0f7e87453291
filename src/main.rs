use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peershuffle::cli;
use peershuffle::settings::{self, RunMode};
use peershuffle::simulation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peershuffle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let settings = cli::Cli::parse().into_settings();
    settings.validate()?;

    info!(
        "Starting {} v{} in {} mode with {} nodes",
        settings::APP_NAME,
        settings::APP_VERSION,
        settings.run_mode,
        settings.node_count
    );
    let report = match settings.run_mode {
        RunMode::Cycle => simulation::run_cycle_simulation(&settings)?,
        RunMode::Async => simulation::run_async_cluster(&settings).await?,
    };

    if settings.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report);
    }
    Ok(())
}
