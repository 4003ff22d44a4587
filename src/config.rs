// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;

use crate::constants::{
    annotations, certmanager, GATEWAY_SHIM_CONTROLLER_NAME, INGRESS_SHIM_CONTROLLER_NAME,
};

/// Process-wide defaults handed to every controller at registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub auto_certificate_annotations: Vec<String>,
    pub issuer_name: String,
    pub issuer_kind: String,
    pub issuer_group: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            auto_certificate_annotations: vec![annotations::TLS_ACME.to_string()],
            issuer_name: String::new(),
            issuer_kind: certmanager::ISSUER_KIND.to_string(),
            issuer_group: certmanager::GROUP.to_string(),
        }
    }
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch; `None` means cluster-wide
    pub namespace: Option<String>,
    pub defaults: Defaults,
    /// Names of the controllers to start
    pub controllers: Vec<String>,
    /// Worker tasks per controller
    pub workers: usize,
    /// Instance name reported on events
    pub pod_name: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        let mut defaults = Defaults::default();
        if let Some(name) = lookup("DEFAULT_ISSUER_NAME") {
            defaults.issuer_name = name;
        }
        if let Some(kind) = lookup("DEFAULT_ISSUER_KIND").filter(|k| !k.is_empty()) {
            defaults.issuer_kind = kind;
        }
        if let Some(group) = lookup("DEFAULT_ISSUER_GROUP").filter(|g| !g.is_empty()) {
            defaults.issuer_group = group;
        }
        if let Some(keys) = lookup("AUTO_CERTIFICATE_ANNOTATIONS") {
            defaults.auto_certificate_annotations = split_list(&keys);
        }

        let controllers = lookup("CONTROLLERS")
            .map(|c| split_list(&c))
            .unwrap_or_else(|| vec![INGRESS_SHIM_CONTROLLER_NAME.to_string()]);
        for name in &controllers {
            if name != INGRESS_SHIM_CONTROLLER_NAME && name != GATEWAY_SHIM_CONTROLLER_NAME {
                bail!("unknown controller '{}' in CONTROLLERS", name);
            }
        }

        let workers: usize = match lookup("WORKERS") {
            Some(w) => w
                .parse()
                .with_context(|| format!("WORKERS must be a positive integer, got '{}'", w))?,
            None => 5,
        };
        if workers == 0 {
            bail!("WORKERS must be at least 1");
        }

        Ok(Config {
            namespace,
            defaults,
            controllers,
            workers,
            pod_name: lookup("POD_NAME"),
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
