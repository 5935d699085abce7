//! Sfumato CLI binary.
//!
//! This binary provides command-line access to the generation queue:
//! - Enqueue requests and process them until idle
//! - Inspect, cancel, retry and clear jobs
//! - Browse, favourite and delete generated images

use clap::Parser;
use sfumato::{Engine, ObservabilityConfig, SfumatoConfig};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, execute};

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    sfumato::init_observability_with_config(
        ObservabilityConfig::new("sfumato")
            .with_log_level(log_level)
            .with_json_logs(cli.json_logs),
    )?;

    let config = SfumatoConfig::load()?;
    tracing::debug!(?config, "Configuration loaded");
    let engine = Engine::open(config)?;

    let result = execute(&engine, cli.command).await;
    sfumato::shutdown_observability();

    if let Err(e) = result {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}
