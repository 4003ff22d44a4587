// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Controller bootstrap: register, start the shared caches, wait for them to
//! sync, then run workers until shutdown.

use crate::cache::SyncPredicate;
use crate::constants::{CACHE_SYNC_POLL_MILLIS, GATEWAY_SHIM_CONTROLLER_NAME, INGRESS_SHIM_CONTROLLER_NAME};
use crate::error::{Result, ShimError};
use crate::shim::{gateway, ingress, Controller, ControllerContext, Registration};
use crate::signal::{shutdown_requested, ShutdownSignal};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Builds a controller's registration from the shared context
pub type ControllerFactory = for<'a> fn(&'a ControllerContext) -> BoxFuture<'a, Result<Registration>>;

/// Every controller this binary can run, by name
pub fn known_controllers() -> Vec<(&'static str, ControllerFactory)> {
    vec![
        (INGRESS_SHIM_CONTROLLER_NAME, ingress::register as ControllerFactory),
        (GATEWAY_SHIM_CONTROLLER_NAME, gateway::register as ControllerFactory),
    ]
}

/// Factories for `names`, in the order given
pub fn enabled_controllers(names: &[String]) -> Result<Vec<(&'static str, ControllerFactory)>> {
    let known = known_controllers();
    names
        .iter()
        .map(|name| {
            known
                .iter()
                .find(|(known_name, _)| known_name == name)
                .copied()
                .ok_or_else(|| ShimError::InvalidConfig(format!("unknown controller '{}'", name)))
        })
        .collect()
}

/// Run the given controllers until the shutdown signal fires.
/// Any registration failure aborts startup before caches or workers run.
pub async fn run(
    ctx: &ControllerContext,
    factories: Vec<(&'static str, ControllerFactory)>,
    workers: usize,
) -> Result<()> {
    let mut registrations = Vec::with_capacity(factories.len());
    for (name, factory) in factories {
        debug!("Registering {} controller", name);
        registrations.push(factory(ctx).await?);
    }

    let cache_tasks = ctx.caches.start(ctx.shutdown.clone());
    let mut shutdown = ctx.shutdown.clone();

    let predicates: Vec<SyncPredicate> = registrations
        .iter()
        .flat_map(|r| r.must_sync.iter().cloned())
        .collect();

    let mut worker_tasks = Vec::new();
    if wait_for_cache_sync(&predicates, &mut shutdown).await {
        for registration in &registrations {
            info!(
                "Starting {} workers for {} controller",
                workers,
                registration.controller.name()
            );
            for _ in 0..workers {
                worker_tasks.push(tokio::spawn(worker(
                    registration.controller.clone(),
                    ctx.shutdown.clone(),
                )));
            }
        }
        shutdown_requested(&mut shutdown).await;
    } else {
        info!("Shutdown requested before caches synced");
    }

    info!("Shutting down controllers");
    for registration in &registrations {
        registration.queue.shutdown();
    }
    for task in worker_tasks.into_iter().chain(cache_tasks) {
        if let Err(e) = task.await {
            warn!("Task did not stop cleanly: {}", e);
        }
    }

    Ok(())
}

/// Wait until every predicate holds. Returns `false` if shutdown came first.
pub async fn wait_for_cache_sync(predicates: &[SyncPredicate], shutdown: &mut ShutdownSignal) -> bool {
    let mut poll = tokio::time::interval(Duration::from_millis(CACHE_SYNC_POLL_MILLIS));
    loop {
        if predicates.iter().all(|synced| synced()) {
            info!("Caches synced");
            return true;
        }
        tokio::select! {
            _ = shutdown_requested(shutdown) => return false,
            _ = poll.tick() => {}
        }
    }
}

async fn worker(controller: Arc<Controller>, mut shutdown: ShutdownSignal) {
    while process_next_item(&controller, &mut shutdown).await {}
    debug!("{} worker stopped", controller.name());
}

/// Handle one key from the controller's queue. Returns `false` once the worker should stop.
pub async fn process_next_item(controller: &Controller, shutdown: &mut ShutdownSignal) -> bool {
    let queue = controller.queue();
    let Some(key) = queue.get().await else {
        return false;
    };

    let result = tokio::select! {
        _ = shutdown_requested(shutdown) => {
            queue.done(&key);
            return false;
        }
        result = controller.process_item(&key) => result,
    };

    match result {
        Ok(()) => queue.forget(&key),
        Err(e) => {
            error!(controller = controller.name(), key = %key, "Error syncing: {}", e);
            queue.add_rate_limited(&key);
        }
    }
    queue.done(&key);
    true
}
