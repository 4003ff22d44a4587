// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-only, cache-backed access to trigger objects regardless of their kind.

use super::trigger::TriggerObject;
use crate::cache::{CachedResource, ResourceCache};
use crate::error::{Result, ShimError};
use crate::types::Gateway;
use k8s_openapi::api::networking::v1::Ingress;
use std::sync::Arc;

/// Lists and fetches trigger objects from a local cache. Never touches the network.
pub trait TriggerLister: Send + Sync {
    fn kind(&self) -> &str;

    /// Objects in `namespace` (all namespaces when empty). Fails while the cache is still loading.
    fn list(&self, namespace: &str) -> Result<Vec<TriggerObject>>;

    fn get(&self, namespace: &str, name: &str) -> Result<TriggerObject>;
}

pub struct CacheLister<K: CachedResource> {
    cache: ResourceCache<K>,
}

impl<K: CachedResource> CacheLister<K> {
    pub fn new(cache: ResourceCache<K>) -> Self {
        Self { cache }
    }
}

pub type IngressLister = CacheLister<Ingress>;
pub type GatewayLister = CacheLister<Gateway>;

impl<K> TriggerLister for CacheLister<K>
where
    K: CachedResource,
    TriggerObject: From<Arc<K>>,
{
    fn kind(&self) -> &str {
        self.cache.kind()
    }

    fn list(&self, namespace: &str) -> Result<Vec<TriggerObject>> {
        if !self.cache.has_synced() {
            return Err(ShimError::CacheNotSynced(self.cache.kind().to_string()));
        }
        Ok(self
            .cache
            .list(namespace)
            .into_iter()
            .map(TriggerObject::from)
            .collect())
    }

    fn get(&self, namespace: &str, name: &str) -> Result<TriggerObject> {
        self.cache.get(namespace, name).map(TriggerObject::from)
    }
}
