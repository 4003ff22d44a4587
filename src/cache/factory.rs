// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{CachedResource, ResourceCache};
use crate::signal::ShutdownSignal;
use crate::types::{Certificate, ClusterIssuer, Issuer};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::info;

type Starter = Box<dyn FnOnce(ShutdownSignal) -> JoinHandle<()> + Send>;

/// Caches shared between controllers. A cache is only allocated when a
/// controller first asks for it, and only allocated caches are started.
#[derive(Clone)]
pub struct SharedCaches {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    namespace: Option<String>,
    ingresses: Mutex<Option<ResourceCache<Ingress>>>,
    certificates: Mutex<Option<ResourceCache<Certificate>>>,
    issuers: Mutex<Option<ResourceCache<Issuer>>>,
    cluster_issuers: Mutex<Option<ResourceCache<ClusterIssuer>>>,
    pending: Mutex<Vec<Starter>>,
    allocated: Mutex<Vec<String>>,
}

impl SharedCaches {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                namespace,
                ingresses: Mutex::new(None),
                certificates: Mutex::new(None),
                issuers: Mutex::new(None),
                cluster_issuers: Mutex::new(None),
                pending: Mutex::new(Vec::new()),
                allocated: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn ingresses(&self) -> ResourceCache<Ingress> {
        self.get_or_allocate(&self.inner.ingresses, || self.namespaced_api())
    }

    pub fn certificates(&self) -> ResourceCache<Certificate> {
        self.get_or_allocate(&self.inner.certificates, || self.namespaced_api())
    }

    pub fn issuers(&self) -> ResourceCache<Issuer> {
        self.get_or_allocate(&self.inner.issuers, || self.namespaced_api())
    }

    /// Cluster issuers are cluster-scoped, so this cache always watches cluster-wide.
    /// Callers running namespaced must not ask for it.
    pub fn cluster_issuers(&self) -> ResourceCache<ClusterIssuer> {
        self.get_or_allocate(&self.inner.cluster_issuers, || {
            Api::all(self.inner.client.clone())
        })
    }

    /// Kinds of the caches allocated so far
    pub fn allocated_kinds(&self) -> Vec<String> {
        self.inner
            .allocated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_allocated(&self, kind: &str) -> bool {
        self.allocated_kinds().iter().any(|k| k == kind)
    }

    /// Start every allocated cache that is not running yet
    pub fn start(&self, shutdown: ShutdownSignal) -> Vec<JoinHandle<()>> {
        let starters: Vec<Starter> = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        info!("Starting {} shared caches", starters.len());
        starters
            .into_iter()
            .map(|start| start(shutdown.clone()))
            .collect()
    }

    fn namespaced_api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        match &self.inner.namespace {
            Some(ns) => Api::namespaced(self.inner.client.clone(), ns),
            None => Api::all(self.inner.client.clone()),
        }
    }

    fn get_or_allocate<K: CachedResource>(
        &self,
        slot: &Mutex<Option<ResourceCache<K>>>,
        api: impl FnOnce() -> Api<K>,
    ) -> ResourceCache<K> {
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cache) = slot.as_ref() {
            return cache.clone();
        }

        let cache = ResourceCache::new(api());
        let runner = cache.clone();
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(move |shutdown| tokio::spawn(runner.run(shutdown))));
        self.inner
            .allocated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cache.kind().to_string());

        *slot = Some(cache.clone());
        cache
    }
}
