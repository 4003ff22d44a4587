// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Uniform read view over the routing objects that can request certificates.

use crate::cache::meta_namespace_key;
use crate::constants::gateway::{SECRET_KIND, TLS_MODE_PASSTHROUGH};
use crate::types::Gateway;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A secret that should hold a certificate for the given hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsBinding {
    pub secret_name: String,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum TriggerObject {
    Ingress(Arc<Ingress>),
    Gateway(Arc<Gateway>),
}

impl From<Arc<Ingress>> for TriggerObject {
    fn from(ing: Arc<Ingress>) -> Self {
        TriggerObject::Ingress(ing)
    }
}

impl From<Arc<Gateway>> for TriggerObject {
    fn from(gw: Arc<Gateway>) -> Self {
        TriggerObject::Gateway(gw)
    }
}

impl TriggerObject {
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerObject::Ingress(_) => "Ingress",
            TriggerObject::Gateway(_) => "Gateway",
        }
    }

    pub fn namespace(&self) -> String {
        match self {
            TriggerObject::Ingress(ing) => ing.namespace(),
            TriggerObject::Gateway(gw) => gw.namespace(),
        }
        .unwrap_or_default()
    }

    pub fn name(&self) -> String {
        match self {
            TriggerObject::Ingress(ing) => ing.name_any(),
            TriggerObject::Gateway(gw) => gw.name_any(),
        }
    }

    pub fn key(&self) -> String {
        match self {
            TriggerObject::Ingress(ing) => meta_namespace_key(ing.as_ref()),
            TriggerObject::Gateway(gw) => meta_namespace_key(gw.as_ref()),
        }
    }

    pub fn uid(&self) -> Option<String> {
        match self {
            TriggerObject::Ingress(ing) => ing.uid(),
            TriggerObject::Gateway(gw) => gw.uid(),
        }
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        match self {
            TriggerObject::Ingress(ing) => ing.annotations(),
            TriggerObject::Gateway(gw) => gw.annotations(),
        }
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations().get(key).map(String::as_str)
    }

    /// Reference used to attach events
    pub fn object_ref(&self) -> ObjectReference {
        match self {
            TriggerObject::Ingress(ing) => ing.object_ref(&()),
            TriggerObject::Gateway(gw) => gw.object_ref(&()),
        }
    }

    pub fn controller_owner_ref(&self) -> Option<OwnerReference> {
        match self {
            TriggerObject::Ingress(ing) => ing.controller_owner_ref(&()),
            TriggerObject::Gateway(gw) => gw.controller_owner_ref(&()),
        }
    }

    /// TLS bindings declared by the object. Entries that cannot be turned into a
    /// certificate come back as `Err` with a human readable reason.
    pub fn tls_bindings(&self) -> Vec<Result<TlsBinding, String>> {
        match self {
            TriggerObject::Ingress(ing) => ingress_bindings(ing),
            TriggerObject::Gateway(gw) => gateway_bindings(gw),
        }
    }

    /// Names of the certificates this object refers to
    pub fn certificate_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for binding in self.tls_bindings().into_iter().flatten() {
            if !names.contains(&binding.secret_name) {
                names.push(binding.secret_name);
            }
        }
        names
    }
}

fn ingress_bindings(ing: &Ingress) -> Vec<Result<TlsBinding, String>> {
    let Some(tls) = ing.spec.as_ref().and_then(|s| s.tls.as_ref()) else {
        return Vec::new();
    };

    tls.iter()
        .enumerate()
        .map(|(i, entry)| {
            let hosts = entry.hosts.clone().unwrap_or_default();
            let secret_name = entry.secret_name.clone().unwrap_or_default();
            if secret_name.is_empty() {
                return Err(format!(
                    "TLS entry {} for hosts {:?} must specify a secretName",
                    i, hosts
                ));
            }
            if hosts.is_empty() {
                return Err(format!(
                    "Secret {:?} for ingress TLS has no hosts specified",
                    secret_name
                ));
            }
            Ok(TlsBinding { secret_name, hosts })
        })
        .collect()
}

fn gateway_bindings(gw: &Gateway) -> Vec<Result<TlsBinding, String>> {
    let namespace = gw.namespace().unwrap_or_default();
    let mut bindings = Vec::new();

    for listener in &gw.spec.listeners {
        let Some(tls) = listener.tls.as_ref() else {
            continue;
        };
        if tls.mode.as_deref() == Some(TLS_MODE_PASSTHROUGH) {
            continue;
        }
        let hostname = listener.hostname.clone().unwrap_or_default();
        if hostname.is_empty() {
            bindings.push(Err(format!(
                "Skipped listener {:?}: a hostname must be set to request a certificate",
                listener.name
            )));
            continue;
        }

        for cert_ref in &tls.certificate_refs {
            let kind = cert_ref.kind.as_deref().unwrap_or(SECRET_KIND);
            let group = cert_ref.group.as_deref().unwrap_or_default();
            if kind != SECRET_KIND || !group.is_empty() {
                bindings.push(Err(format!(
                    "Skipped listener {:?}: certificateRef {:?} must refer to a core Secret, not {}/{}",
                    listener.name, cert_ref.name, group, kind
                )));
                continue;
            }
            if cert_ref.namespace.as_deref().is_some_and(|ns| ns != namespace) {
                bindings.push(Err(format!(
                    "Skipped listener {:?}: cross-namespace certificateRef {:?} is not supported",
                    listener.name, cert_ref.name
                )));
                continue;
            }
            bindings.push(Ok(TlsBinding {
                secret_name: cert_ref.name.clone(),
                hosts: vec![hostname.clone()],
            }));
        }
    }

    bindings
}
