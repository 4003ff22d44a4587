// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Certificate shims: keep a `Certificate` in place for every routing object
//! that asks for one.
//!
//! Both shims share [`Controller`]; they only differ in which trigger cache
//! feeds the queue (see [`ingress`] and [`gateway`]).

pub mod events;
pub mod gateway;
pub mod ingress;
pub mod issuer;
pub mod lister;
pub mod sync;
pub mod trigger;

use crate::cache::{split_meta_namespace_key, BlockingDeleteHandler, SharedCaches, SyncPredicate};
use crate::config::{Config, Defaults};
use crate::error::Result;
use crate::queue::WorkQueue;
use crate::signal::ShutdownSignal;
use crate::types::Certificate;
use events::EventRecorder;
use issuer::IssuerHelper;
use kube::{Client, ResourceExt};
use lister::TriggerLister;
use std::sync::Arc;
use sync::should_sync;
use tracing::{debug, instrument, warn};
use trigger::TriggerObject;

/// Everything a controller needs from the hosting process to register itself
#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    /// `None` when running cluster-wide
    pub namespace: Option<String>,
    pub defaults: Defaults,
    pub recorder: EventRecorder,
    pub caches: SharedCaches,
    pub shutdown: ShutdownSignal,
}

impl ControllerContext {
    pub fn new(client: Client, config: &Config, shutdown: ShutdownSignal) -> Self {
        Self {
            caches: SharedCaches::new(client.clone(), config.namespace.clone()),
            recorder: EventRecorder::new(client.clone(), config.pod_name.clone()),
            client,
            namespace: config.namespace.clone(),
            defaults: config.defaults.clone(),
            shutdown,
        }
    }
}

/// The result of registering a controller: its queue, the caches that must be
/// synced before workers start, and the controller to process items with
pub struct Registration {
    pub controller: Arc<Controller>,
    pub queue: WorkQueue,
    pub must_sync: Vec<SyncPredicate>,
}

pub struct Controller {
    name: &'static str,
    queue: WorkQueue,
    client: Client,
    recorder: EventRecorder,
    namespace: Option<String>,
    objects: Arc<dyn TriggerLister>,
    certificates: crate::cache::ResourceCache<Certificate>,
    helper: IssuerHelper,
    defaults: Defaults,
}

impl Controller {
    /// Wiring common to both shims. The trigger cache must already feed `queue`.
    pub(crate) fn shared_register(
        ctx: &ControllerContext,
        name: &'static str,
        queue: WorkQueue,
        objects: Arc<dyn TriggerLister>,
        objects_synced: SyncPredicate,
    ) -> Registration {
        let certificates = ctx.caches.certificates();
        let issuers = ctx.caches.issuers();
        let mut must_sync = vec![
            objects_synced,
            certificates.sync_predicate(),
            issuers.sync_predicate(),
        ];

        // cluster issuers can only be watched when running cluster-wide
        let cluster_issuers = if ctx.namespace.is_none() {
            let cluster_issuers = ctx.caches.cluster_issuers();
            must_sync.push(cluster_issuers.sync_predicate());
            Some(cluster_issuers)
        } else {
            None
        };

        let controller = Arc::new(Controller {
            name,
            queue: queue.clone(),
            client: ctx.client.clone(),
            recorder: ctx.recorder.clone(),
            namespace: ctx.namespace.clone(),
            objects,
            certificates: certificates.clone(),
            helper: IssuerHelper::new(issuers, cluster_issuers, ctx.namespace.clone()),
            defaults: ctx.defaults.clone(),
        });

        let weak = Arc::downgrade(&controller);
        certificates.add_event_handler(Arc::new(BlockingDeleteHandler::new(
            move |crt: &Certificate| {
                if let Some(controller) = weak.upgrade() {
                    controller.certificate_deleted(crt);
                }
            },
        )));

        Registration {
            controller,
            queue,
            must_sync,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Re-enqueue the trigger objects that refer to a deleted certificate
    pub fn certificate_deleted(&self, crt: &Certificate) {
        let (Some(namespace), Some(name)) = (crt.namespace(), crt.metadata.name.clone()) else {
            warn!(controller = self.name, "Deleted object is not a usable certificate: {:?}", crt.metadata);
            return;
        };

        let objects = match self.objects_for_certificate(crt) {
            Ok(objects) => objects,
            Err(e) => {
                warn!(
                    controller = self.name,
                    "Error looking up {} observing certificate {}/{}: {}",
                    self.objects.kind(),
                    namespace,
                    name,
                    e
                );
                return;
            }
        };

        for obj in objects {
            debug!(
                controller = self.name,
                "Certificate {}/{} deleted, re-queuing {} {}",
                namespace,
                name,
                obj.kind(),
                obj.key()
            );
            self.queue.add(obj.key());
        }
    }

    /// Trigger objects in the certificate's namespace that refer to it
    pub fn objects_for_certificate(&self, crt: &Certificate) -> Result<Vec<TriggerObject>> {
        let namespace = crt.namespace().unwrap_or_default();
        let name = crt.name_any();

        Ok(self
            .objects
            .list(&namespace)?
            .into_iter()
            .filter(|obj| should_sync(obj, &self.defaults.auto_certificate_annotations))
            .filter(|obj| obj.certificate_names().iter().any(|n| *n == name))
            .collect())
    }

    /// Resolve a queue key and sync the object behind it.
    /// Malformed keys and vanished objects are dropped without error.
    #[instrument(skip(self), fields(controller = self.name))]
    pub async fn process_item(&self, key: &str) -> Result<()> {
        let (namespace, name) = match split_meta_namespace_key(key) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("{}", e);
                return Ok(());
            }
        };

        let obj = match self.objects.get(&namespace, &name) {
            Ok(obj) => obj,
            Err(e) if e.is_not_found() => {
                debug!("{} '{}' in work queue no longer exists", self.objects.kind(), key);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.sync(&obj).await
    }
}
