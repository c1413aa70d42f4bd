//! Proxmox VE Exporter CLI
//!
//! Serves Proxmox VE virtual machine and datastore metrics for Prometheus.

use clap::Parser;
use pve_exporter::{
    config::CliArgs,
    metrics::{Collector, MetricSchema, MetricsServer},
    upstream::PveClient,
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = CliArgs::parse();

    let config = match args.load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "PVE Exporter v{} exporting node {} from {}",
        pve_exporter::VERSION,
        config.upstream.node,
        config.upstream.endpoint
    );

    let client = match PveClient::new(&config.upstream) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create upstream client: {}", e);
            std::process::exit(1);
        }
    };

    let collector = Collector::new(
        Arc::new(client),
        Arc::new(MetricSchema::default()),
        config.upstream.node.clone(),
    );
    let server = MetricsServer::new(config.server, Arc::new(collector));

    if let Err(e) = server.run_until(shutdown_signal()).await {
        error!("Metrics server failed: {}", e);
        std::process::exit(1);
    }

    info!("Shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
