// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShimError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{controller}: couldn't discover gateway API resources: {source}")]
    Discovery {
        controller: &'static str,
        #[source]
        source: kube::Error,
    },

    #[error("{0}: no gateway API resources were discovered (are the Gateway API CRDs installed?)")]
    GatewayApiNotInstalled(&'static str),

    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },

    #[error("{0} cache has not synced yet")]
    CacheNotSynced(String),

    #[error("invalid resource key: {0}")]
    InvalidKey(String),

    #[error("cluster issuers are not available when running in namespace '{0}'")]
    ClusterIssuersUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Bad trigger configuration: {0}")]
    BadConfig(String),
}

impl ShimError {
    /// True when the error only says the object is gone from the cache.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShimError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ShimError>;
