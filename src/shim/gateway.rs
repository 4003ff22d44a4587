// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::lister::GatewayLister;
use super::{Controller, ControllerContext, Registration};
use crate::cache::{QueuingEventHandler, ResourceCache};
use crate::constants::GATEWAY_SHIM_CONTROLLER_NAME;
use crate::error::Result;
use crate::kubernetes::ensure_gateway_api_installed;
use crate::queue::WorkQueue;
use crate::types::Gateway;
use futures::future::{BoxFuture, FutureExt};
use kube::Api;
use std::sync::Arc;
use tracing::info;

/// Register the gateway shim.
///
/// The Gateway API is an optional install, so discovery runs first and a
/// missing API fails registration before any queue or cache exists. The
/// gateway cache is owned by this controller and started here, not by the
/// shared cache factory.
pub fn register(ctx: &ControllerContext) -> BoxFuture<'_, Result<Registration>> {
    async move {
        ensure_gateway_api_installed(&ctx.client, GATEWAY_SHIM_CONTROLLER_NAME).await?;

        let api: Api<Gateway> = match &ctx.namespace {
            Some(ns) => Api::namespaced(ctx.client.clone(), ns),
            None => Api::all(ctx.client.clone()),
        };
        let gateways = ResourceCache::new(api);
        let registration = wire(ctx, gateways.clone());
        tokio::spawn(gateways.run(ctx.shutdown.clone()));

        info!("Registered {} controller", GATEWAY_SHIM_CONTROLLER_NAME);
        Ok(registration)
    }
    .boxed()
}

fn wire(ctx: &ControllerContext, gateways: ResourceCache<Gateway>) -> Registration {
    let queue = WorkQueue::new(GATEWAY_SHIM_CONTROLLER_NAME);
    gateways.add_event_handler(Arc::new(QueuingEventHandler::new(queue.clone())));
    let synced = gateways.sync_predicate();

    Controller::shared_register(
        ctx,
        GATEWAY_SHIM_CONTROLLER_NAME,
        queue,
        Arc::new(GatewayLister::new(gateways)),
        synced,
    )
}
