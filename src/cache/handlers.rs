// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{meta_namespace_key, ResourceEventHandler};
use crate::queue::WorkQueue;
use kube::ResourceExt;

/// Enqueues the key of every added, updated or deleted object
pub struct QueuingEventHandler {
    queue: WorkQueue,
}

impl QueuingEventHandler {
    pub fn new(queue: WorkQueue) -> Self {
        Self { queue }
    }
}

impl<K: ResourceExt> ResourceEventHandler<K> for QueuingEventHandler {
    fn on_add(&self, obj: &K) {
        self.queue.add(meta_namespace_key(obj));
    }

    fn on_update(&self, _old: &K, new: &K) {
        self.queue.add(meta_namespace_key(new));
    }

    fn on_delete(&self, obj: &K) {
        self.queue.add(meta_namespace_key(obj));
    }
}

/// Runs a function on delete events only, inline on the cache's event loop.
/// The deleted object is only valid for the duration of the call.
pub struct BlockingDeleteHandler<F> {
    work: F,
}

impl<F> BlockingDeleteHandler<F> {
    pub fn new(work: F) -> Self {
        Self { work }
    }
}

impl<K, F> ResourceEventHandler<K> for BlockingDeleteHandler<F>
where
    F: Fn(&K) + Send + Sync,
{
    fn on_add(&self, _obj: &K) {}

    fn on_update(&self, _old: &K, _new: &K) {}

    fn on_delete(&self, obj: &K) {
        (self.work)(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_ingress;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_queuing_handler_enqueues_every_event() {
        let queue = WorkQueue::new("test");
        let handler = QueuingEventHandler::new(queue.clone());
        let web = make_ingress("ns1", "web", &[], &[]);
        let api = make_ingress("ns1", "api", &[], &[]);

        handler.on_add(&web);
        handler.on_update(&web, &web);
        handler.on_delete(&api);

        // the duplicate web key collapses into one entry
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_blocking_delete_handler_ignores_add_and_update() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = BlockingDeleteHandler::new(move |_: &k8s_openapi::api::networking::v1::Ingress| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let web = make_ingress("ns1", "web", &[], &[]);

        handler.on_add(&web);
        handler.on_update(&web, &web);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        handler.on_delete(&web);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
