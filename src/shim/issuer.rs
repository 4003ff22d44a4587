// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::cache::ResourceCache;
use crate::constants::certmanager::{CLUSTER_ISSUER_KIND, GROUP, ISSUER_KIND};
use crate::error::{Result, ShimError};
use crate::types::{ClusterIssuer, Issuer, IssuerRef, IssuerSpec};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum GenericIssuer {
    Issuer(Arc<Issuer>),
    ClusterIssuer(Arc<ClusterIssuer>),
}

impl GenericIssuer {
    pub fn spec(&self) -> &IssuerSpec {
        match self {
            GenericIssuer::Issuer(issuer) => &issuer.spec,
            GenericIssuer::ClusterIssuer(issuer) => &issuer.spec.issuer,
        }
    }

    pub fn is_acme(&self) -> bool {
        self.spec().is_acme()
    }
}

/// Resolves issuer references against the issuer caches.
/// `cluster_issuers` is `None` when running namespaced.
#[derive(Clone)]
pub struct IssuerHelper {
    issuers: ResourceCache<Issuer>,
    cluster_issuers: Option<ResourceCache<ClusterIssuer>>,
    namespace: Option<String>,
}

impl IssuerHelper {
    pub fn new(
        issuers: ResourceCache<Issuer>,
        cluster_issuers: Option<ResourceCache<ClusterIssuer>>,
        namespace: Option<String>,
    ) -> Self {
        Self {
            issuers,
            cluster_issuers,
            namespace,
        }
    }

    pub fn cluster_issuers_available(&self) -> bool {
        self.cluster_issuers.is_some()
    }

    pub fn get_generic_issuer(&self, issuer_ref: &IssuerRef, namespace: &str) -> Result<GenericIssuer> {
        let group = issuer_ref.group.as_deref().unwrap_or(GROUP);
        if !group.is_empty() && group != GROUP {
            return Err(ShimError::BadConfig(format!(
                "issuers from group {:?} cannot be looked up",
                group
            )));
        }

        match issuer_ref.kind.as_deref().unwrap_or(ISSUER_KIND) {
            ISSUER_KIND => self
                .issuers
                .get(namespace, &issuer_ref.name)
                .map(GenericIssuer::Issuer),
            CLUSTER_ISSUER_KIND => {
                let Some(cluster_issuers) = self.cluster_issuers.as_ref() else {
                    return Err(ShimError::ClusterIssuersUnavailable(
                        self.namespace.clone().unwrap_or_default(),
                    ));
                };
                cluster_issuers
                    .get("", &issuer_ref.name)
                    .map(GenericIssuer::ClusterIssuer)
            }
            other => Err(ShimError::BadConfig(format!("unknown issuer kind {:?}", other))),
        }
    }
}
