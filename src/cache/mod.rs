// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Locally synchronized caches of cluster objects with change notifications.
//!
//! A [`ResourceCache`] keeps a reflector store up to date from a watch stream and
//! calls its registered [`ResourceEventHandler`]s after every change has been
//! applied to the store, so handlers always observe the post-event state.

pub mod factory;
pub mod handlers;

pub use factory::SharedCaches;
pub use handlers::{BlockingDeleteHandler, QueuingEventHandler};

use crate::error::{Result, ShimError};
use crate::signal::{shutdown_requested, ShutdownSignal};
use futures::StreamExt;
use kube::runtime::reflector::{self, store::Writer, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Resource, ResourceExt};
use kube_runtime::watcher::Config as WatcherConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// A check that a cache has completed its initial list
pub type SyncPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Bounds shared by every kind the caches can hold
pub trait CachedResource:
    Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static
{
}

impl<K> CachedResource for K where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static
{
}

/// Observer of cache changes. Called synchronously from the cache's event loop.
pub trait ResourceEventHandler<K>: Send + Sync {
    fn on_add(&self, obj: &K);
    fn on_update(&self, old: &K, new: &K);
    fn on_delete(&self, obj: &K);
}

enum Notification<K> {
    Add(K),
    Update(Arc<K>, K),
    Delete(Arc<K>),
}

pub struct ResourceCache<K: CachedResource> {
    kind: String,
    api: Api<K>,
    store: Store<K>,
    writer: Arc<Mutex<Writer<K>>>,
    relist: Arc<Mutex<Option<Vec<K>>>>,
    synced: Arc<AtomicBool>,
    handlers: Arc<RwLock<Vec<Arc<dyn ResourceEventHandler<K>>>>>,
}

impl<K: CachedResource> Clone for ResourceCache<K> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            api: self.api.clone(),
            store: self.store.clone(),
            writer: self.writer.clone(),
            relist: self.relist.clone(),
            synced: self.synced.clone(),
            handlers: self.handlers.clone(),
        }
    }
}

impl<K: CachedResource> ResourceCache<K> {
    pub fn new(api: Api<K>) -> Self {
        let (store, writer) = reflector::store();
        Self {
            kind: K::kind(&()).to_string(),
            api,
            store,
            writer: Arc::new(Mutex::new(writer)),
            relist: Arc::new(Mutex::new(None)),
            synced: Arc::new(AtomicBool::new(false)),
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    pub fn sync_predicate(&self) -> SyncPredicate {
        let synced = self.synced.clone();
        Arc::new(move || synced.load(Ordering::SeqCst))
    }

    pub fn add_event_handler(&self, handler: Arc<dyn ResourceEventHandler<K>>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Look up an object by namespace and name. Cluster-scoped kinds use an empty namespace.
    pub fn get(&self, namespace: &str, name: &str) -> Result<Arc<K>> {
        let mut obj_ref = ObjectRef::<K>::new(name);
        if !namespace.is_empty() {
            obj_ref = obj_ref.within(namespace);
        }
        self.store.get(&obj_ref).ok_or_else(|| ShimError::NotFound {
            kind: self.kind.clone(),
            key: key_for(namespace, name),
        })
    }

    /// Snapshot of the objects in a namespace; every object when `namespace` is empty
    pub fn list(&self, namespace: &str) -> Vec<Arc<K>> {
        self.store
            .state()
            .into_iter()
            .filter(|obj| namespace.is_empty() || obj.namespace().as_deref() == Some(namespace))
            .collect()
    }

    /// Apply one watch event to the store, then notify the handlers
    pub fn handle_event(&self, event: watcher::Event<K>) {
        let notifications = match &event {
            watcher::Event::Apply(obj) => {
                let existing = self.store.get(&ObjectRef::from_obj(obj));
                vec![match existing {
                    Some(old) => Notification::Update(old, obj.clone()),
                    None => Notification::Add(obj.clone()),
                }]
            }
            watcher::Event::Delete(obj) => vec![Notification::Delete(Arc::new(obj.clone()))],
            watcher::Event::Init => {
                *self.relist.lock().unwrap_or_else(PoisonError::into_inner) = Some(Vec::new());
                Vec::new()
            }
            watcher::Event::InitApply(obj) => {
                self.relist
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert_with(Vec::new)
                    .push(obj.clone());
                Vec::new()
            }
            watcher::Event::InitDone => self.relist_notifications(),
        };

        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply_watcher_event(&event);

        if matches!(event, watcher::Event::InitDone) && !self.synced.swap(true, Ordering::SeqCst) {
            info!("{} cache synced with {} objects", self.kind, self.store.state().len());
        }

        self.notify(notifications);
    }

    /// Diff a completed relist against the current store contents
    fn relist_notifications(&self) -> Vec<Notification<K>> {
        let listed = self
            .relist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();

        let mut previous: HashMap<ObjectRef<K>, Arc<K>> = self
            .store
            .state()
            .into_iter()
            .map(|obj| (ObjectRef::from_obj(obj.as_ref()), obj))
            .collect();

        let mut notifications = Vec::with_capacity(listed.len());
        for obj in listed {
            match previous.remove(&ObjectRef::from_obj(&obj)) {
                Some(old) => notifications.push(Notification::Update(old, obj)),
                None => notifications.push(Notification::Add(obj)),
            }
        }
        // Whatever is left disappeared while the watch was down
        notifications.extend(previous.into_values().map(Notification::Delete));
        notifications
    }

    fn notify(&self, notifications: Vec<Notification<K>>) {
        if notifications.is_empty() {
            return;
        }
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for notification in &notifications {
            for handler in &handlers {
                match notification {
                    Notification::Add(obj) => handler.on_add(obj),
                    Notification::Update(old, new) => handler.on_update(old, new),
                    Notification::Delete(obj) => handler.on_delete(obj),
                }
            }
        }
    }

    /// Keep the cache in sync with the cluster until shutdown is requested
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!("Starting {} cache", self.kind);
        let mut events = watcher(self.api.clone(), WatcherConfig::default())
            .default_backoff()
            .boxed();

        loop {
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                event = events.next() => match event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => warn!("{} watch error: {}", self.kind, e),
                    None => break,
                },
            }
        }

        debug!("{} cache stopped", self.kind);
    }
}

/// Queue key of an object: `namespace/name`, or just `name` when cluster-scoped
pub fn meta_namespace_key<K: ResourceExt>(obj: &K) -> String {
    key_for(&obj.namespace().unwrap_or_default(), &obj.name_any())
}

pub fn key_for(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", namespace, name)
    }
}

/// Split a queue key back into `(namespace, name)`
pub fn split_meta_namespace_key(key: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = key.split('/').collect();
    match parts.as_slice() {
        [name] => Ok((String::new(), name.to_string())),
        [namespace, name] => Ok((namespace.to_string(), name.to_string())),
        _ => Err(ShimError::InvalidKey(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{make_ingress, seed, MockService};
    use k8s_openapi::api::networking::v1::Ingress;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ResourceEventHandler<Ingress> for Recorder {
        fn on_add(&self, obj: &Ingress) {
            self.events.lock().unwrap().push(format!("add {}", meta_namespace_key(obj)));
        }
        fn on_update(&self, _old: &Ingress, new: &Ingress) {
            self.events.lock().unwrap().push(format!("update {}", meta_namespace_key(new)));
        }
        fn on_delete(&self, obj: &Ingress) {
            self.events.lock().unwrap().push(format!("delete {}", meta_namespace_key(obj)));
        }
    }

    fn make_cache() -> (ResourceCache<Ingress>, Arc<Recorder>) {
        let cache = ResourceCache::new(Api::all(MockService::new().into_client()));
        let recorder = Arc::new(Recorder::default());
        cache.add_event_handler(recorder.clone());
        (cache, recorder)
    }

    #[tokio::test]
    async fn test_synced_only_after_init_done() {
        let (cache, _) = make_cache();
        let predicate = cache.sync_predicate();

        cache.handle_event(watcher::Event::Init);
        cache.handle_event(watcher::Event::InitApply(make_ingress("ns1", "web", &[], &[])));
        assert!(!cache.has_synced());
        assert!(!predicate());

        cache.handle_event(watcher::Event::InitDone);
        assert!(cache.has_synced());
        assert!(predicate());
        assert!(cache.get("ns1", "web").is_ok());
    }

    #[tokio::test]
    async fn test_apply_dispatches_add_then_update() {
        let (cache, recorder) = make_cache();
        seed(&cache, vec![]);

        cache.handle_event(watcher::Event::Apply(make_ingress("ns1", "web", &[], &[])));
        cache.handle_event(watcher::Event::Apply(make_ingress("ns1", "web", &[], &[])));

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["add ns1/web".to_string(), "update ns1/web".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_removes_before_notifying() {
        let (cache, recorder) = make_cache();
        seed(&cache, vec![make_ingress("ns1", "web", &[], &[])]);

        cache.handle_event(watcher::Event::Delete(make_ingress("ns1", "web", &[], &[])));

        assert!(cache.get("ns1", "web").unwrap_err().is_not_found());
        assert_eq!(recorder.events.lock().unwrap().last().unwrap(), "delete ns1/web");
    }

    #[tokio::test]
    async fn test_relist_reports_vanished_objects_as_deleted() {
        let (cache, recorder) = make_cache();
        seed(
            &cache,
            vec![
                make_ingress("ns1", "web", &[], &[]),
                make_ingress("ns1", "api", &[], &[]),
            ],
        );
        recorder.events.lock().unwrap().clear();

        seed(&cache, vec![make_ingress("ns1", "web", &[], &[])]);

        let events = recorder.events.lock().unwrap().clone();
        assert!(events.contains(&"update ns1/web".to_string()));
        assert!(events.contains(&"delete ns1/api".to_string()));
        assert!(cache.get("ns1", "api").is_err());
    }

    #[tokio::test]
    async fn test_list_filters_by_namespace() {
        let (cache, _) = make_cache();
        seed(
            &cache,
            vec![
                make_ingress("ns1", "web", &[], &[]),
                make_ingress("ns2", "web", &[], &[]),
            ],
        );

        assert_eq!(cache.list("ns1").len(), 1);
        assert_eq!(cache.list("").len(), 2);
        assert!(cache.list("ns3").is_empty());
    }

    #[test]
    fn test_split_meta_namespace_key() {
        assert_eq!(
            split_meta_namespace_key("ns1/web").unwrap(),
            ("ns1".to_string(), "web".to_string())
        );
        assert_eq!(
            split_meta_namespace_key("letsencrypt").unwrap(),
            (String::new(), "letsencrypt".to_string())
        );
        assert!(split_meta_namespace_key("a/b/c").is_err());
    }

    #[test]
    fn test_meta_namespace_key() {
        let ing = make_ingress("ns1", "web", &[], &[]);
        assert_eq!(meta_namespace_key(&ing), "ns1/web");
        assert_eq!(key_for("", "cluster-wide"), "cluster-wide");
    }
}
