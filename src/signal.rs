// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Process-wide shutdown signal shared by caches and workers.

use tokio::sync::watch;
use tracing::info;

/// Receiving side of the shutdown signal; flips to `true` once
pub type ShutdownSignal = watch::Receiver<bool>;

pub fn shutdown_channel() -> (watch::Sender<bool>, ShutdownSignal) {
    watch::channel(false)
}

/// Resolves once shutdown was requested or the sender is gone
pub async fn shutdown_requested(signal: &mut ShutdownSignal) {
    loop {
        if *signal.borrow_and_update() {
            return;
        }
        if signal.changed().await.is_err() {
            return;
        }
    }
}

/// Wait for SIGINT or SIGTERM, then flip the shutdown signal
pub async fn forward_os_signals(tx: watch::Sender<bool>) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    let _ = tx.send(true);
    Ok(())
}
