//! agent-workers CLI entry point.
//!
//! Initializes logging, resolves settings and delegates to the CLI module.

use agent_workers::cli::log_filter;
use agent_workers::settings::Settings;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = agent_workers::cli::parse_cli();
    let rust_log = std::env::var("RUST_LOG").ok();

    // Logging comes up before settings so their warnings are not lost.
    // Priority: RUST_LOG env var > --log-level CLI arg > LOG_LEVEL setting
    let provisional = log_filter(rust_log.as_deref(), cli.log_level.as_deref(), "info");
    let (filter, handle) = reload::Layer::new(EnvFilter::new(&provisional));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::load()?;
    let resolved = log_filter(
        rust_log.as_deref(),
        cli.log_level.as_deref(),
        &settings.log_level,
    );
    if resolved != provisional {
        handle.reload(EnvFilter::new(&resolved))?;
    }

    agent_workers::cli::run_with_cli(cli, settings).await
}
