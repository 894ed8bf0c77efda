//! Risk Engine - Main Entry Point
//!
//! Usage: `risk-engine [CONFIG_FILE]`

use anyhow::Context;
use api::{init_logging, run_server, Settings};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref()).context("Failed to load settings")?;

    init_logging(&settings.logging).context("Failed to set tracing subscriber")?;

    info!("=== Risk Engine v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Aggregation {:?}, alerting at {} and above",
        settings.engine.aggregation, settings.engine.alerts.alertable_tier
    );

    run_server(settings).await?;

    Ok(())
}
