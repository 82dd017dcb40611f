mod config;
mod frames;
mod metrics;
mod runner;

use camera_store::{camera_store, table_to_json, CameraReadingTable};
use clap::Parser;
use config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    config.validate()?;

    info!("Starting camera simulator");
    info!(
        "Tick: {}ms, Frames: {}, Person rate: {}, Emit JSON: {}",
        config.tick_ms, config.frames, config.person_rate, config.emit_json
    );

    // Initialize metrics
    metrics::init_metrics()?;

    let store = camera_store();
    info!("Reading table seeded with {} cameras", store.get().len());

    let metrics_sub = store.subscribe(metrics::record_table);
    let json_sub = config.emit_json.then(|| store.subscribe(print_table));

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let produced = runner::run(store.clone(), &config, shutdown).await;

    metrics_sub.unsubscribe();
    if let Some(sub) = json_sub {
        sub.unsubscribe();
    }

    info!("Generated {} frames", produced);
    info!("Final metrics:\n{}", metrics::gather_metrics()?);
    info!("Shutting down");

    Ok(())
}

/// Writes each table snapshot to stdout as one JSON line.
fn print_table(table: &CameraReadingTable) {
    match table_to_json(table) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize reading table: {}", e),
    }
}
