// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use kube::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use certshim::config::Config;
use certshim::runner::{enabled_controllers, run};
use certshim::shim::ControllerContext;
use certshim::signal::{forward_os_signals, shutdown_channel};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting certshim");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, controllers={:?}, workers={}",
        config.namespace.as_deref().unwrap_or("<all>"),
        config.controllers,
        config.workers
    );
    let factories = enabled_controllers(&config.controllers)?;

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    let (shutdown_tx, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if let Err(e) = forward_os_signals(shutdown_tx).await {
            error!("Failed to listen for shutdown signals: {}", e);
        }
    });

    let ctx = ControllerContext::new(client, &config, shutdown);
    run(&ctx, factories, config.workers)
        .await
        .context("controllers failed to start")?;

    info!("certshim stopped");
    Ok(())
}
