// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and building fixtures.

use crate::config::{Config, Defaults};
use crate::shim::ControllerContext;
use crate::signal::shutdown_channel;
use crate::types::gateway::{GatewaySpec, GatewayTlsConfig, Listener, SecretObjectReference};
use crate::types::{Certificate, CertificateSpec, Gateway, IssuerRef};
use http::{Request, Response};
use k8s_openapi::api::networking::v1::{Ingress, IngressSpec, IngressTLS};
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::runtime::watcher;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request seen by the mock service
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
}

/// A mock HTTP service that returns predefined responses based on request paths
/// and records every request it receives.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Requests received so far, excluding event publishing
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.path.starts_with("/apis/events.k8s.io"))
            .cloned()
            .collect()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /apis/cert-manager.io/v1/namespaces/ns1/certificates/web-tls
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
        });
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create an APIResourceList response for a group version
pub fn api_resource_list_json(group_version: &str, resources: &[(&str, &str)]) -> String {
    let resources: Vec<serde_json::Value> = resources
        .iter()
        .map(|(name, kind)| {
            serde_json::json!({
                "name": name,
                "singularName": "",
                "namespaced": true,
                "kind": kind,
                "verbs": ["get", "list", "watch"]
            })
        })
        .collect();

    serde_json::json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources
    })
    .to_string()
}

/// Build an ingress with annotations and `(secret, hosts)` TLS entries
pub fn make_ingress(
    namespace: &str,
    name: &str,
    annotations: &[(&str, &str)],
    tls: &[(&str, &[&str])],
) -> Ingress {
    Ingress {
        metadata: make_meta(namespace, name, annotations),
        spec: Some(IngressSpec {
            tls: Some(
                tls.iter()
                    .map(|(secret, hosts)| IngressTLS {
                        secret_name: Some(secret.to_string()),
                        hosts: Some(hosts.iter().map(|h| h.to_string()).collect()),
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build a gateway with one HTTPS listener per `(hostname, secret)` pair
pub fn make_gateway(
    namespace: &str,
    name: &str,
    annotations: &[(&str, &str)],
    listeners: &[(&str, &str)],
) -> Gateway {
    Gateway {
        metadata: make_meta(namespace, name, annotations),
        spec: GatewaySpec {
            gateway_class_name: "example".to_string(),
            listeners: listeners
                .iter()
                .enumerate()
                .map(|(i, (hostname, secret))| Listener {
                    name: format!("https-{}", i),
                    hostname: Some(hostname.to_string()),
                    port: 443,
                    protocol: "HTTPS".to_string(),
                    tls: Some(GatewayTlsConfig {
                        mode: None,
                        certificate_refs: vec![SecretObjectReference {
                            name: secret.to_string(),
                            ..Default::default()
                        }],
                    }),
                })
                .collect(),
        },
    }
}

/// Build a certificate, optionally controlled by the object with `owner_uid`
pub fn make_certificate(namespace: &str, name: &str, owner_uid: Option<&str>) -> Certificate {
    let mut meta = make_meta(namespace, name, &[]);
    meta.owner_references = owner_uid.map(|uid| {
        vec![k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference {
            api_version: "networking.k8s.io/v1".to_string(),
            kind: "Ingress".to_string(),
            name: "owner".to_string(),
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }]
    });
    Certificate {
        metadata: meta,
        spec: CertificateSpec {
            secret_name: name.to_string(),
            issuer_ref: IssuerRef {
                name: "letsencrypt".to_string(),
                ..Default::default()
            },
            ..Default::default()
        },
    }
}

fn make_meta(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        uid: Some(format!("{}-{}-uid", namespace, name)),
        annotations: Some(
            annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}

/// Load objects into a cache the way an initial list would
pub fn seed<K: crate::cache::CachedResource>(cache: &crate::cache::ResourceCache<K>, objs: Vec<K>) {
    cache.handle_event(watcher::Event::Init);
    for obj in objs {
        cache.handle_event(watcher::Event::InitApply(obj));
    }
    cache.handle_event(watcher::Event::InitDone);
}

/// Controller context over a mock API server. Its shutdown signal has already fired.
pub fn make_context(service: MockService, namespace: Option<&str>) -> ControllerContext {
    let config = Config {
        namespace: namespace.map(String::from),
        defaults: Defaults::default(),
        controllers: vec![],
        workers: 1,
        pod_name: None,
    };
    let (_tx, shutdown) = shutdown_channel();
    ControllerContext::new(service.into_client(), &config, shutdown)
}
