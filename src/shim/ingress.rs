// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::lister::IngressLister;
use super::{Controller, ControllerContext, Registration};
use crate::cache::QueuingEventHandler;
use crate::constants::INGRESS_SHIM_CONTROLLER_NAME;
use crate::error::Result;
use crate::queue::WorkQueue;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::info;

/// Register the ingress shim: every Ingress event queues its key
pub fn register(ctx: &ControllerContext) -> BoxFuture<'_, Result<Registration>> {
    async move {
        let queue = WorkQueue::new(INGRESS_SHIM_CONTROLLER_NAME);
        let ingresses = ctx.caches.ingresses();
        ingresses.add_event_handler(Arc::new(QueuingEventHandler::new(queue.clone())));
        let synced = ingresses.sync_predicate();

        info!("Registered {} controller", INGRESS_SHIM_CONTROLLER_NAME);
        Ok(Controller::shared_register(
            ctx,
            INGRESS_SHIM_CONTROLLER_NAME,
            queue,
            Arc::new(IngressLister::new(ingresses)),
            synced,
        ))
    }
    .boxed()
}
