// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Turns a trigger object into the Certificates it asks for and applies them.

use super::trigger::{TlsBinding, TriggerObject};
use super::Controller;
use crate::config::Defaults;
use crate::constants::certmanager::{CLUSTER_ISSUER_KIND, GROUP, ISSUER_KIND};
use crate::constants::{annotations, reasons, KNOWN_KEY_USAGES};
use crate::error::{Result, ShimError};
use crate::types::{Certificate, CertificateSpec, IssuerRef};
use kube::{api::PostParams, Api, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Certificate annotations owned by this controller
const MANAGED_ANNOTATIONS: &[&str] = &[
    annotations::OVERRIDE_INGRESS_NAME,
    annotations::INGRESS_CLASS,
];

/// Whether the object asks for certificates at all
pub fn should_sync(obj: &TriggerObject, auto_annotations: &[String]) -> bool {
    let has = |key: &str| obj.annotation(key).is_some_and(|v| !v.is_empty());
    if has(annotations::ISSUER) || has(annotations::CLUSTER_ISSUER) {
        return true;
    }
    auto_annotations
        .iter()
        .any(|key| obj.annotation(key) == Some("true"))
}

/// Work out which issuer the object wants, falling back to the defaults
pub fn issuer_for_object(obj: &TriggerObject, defaults: &Defaults) -> Result<IssuerRef> {
    let non_empty = |key: &str| obj.annotation(key).filter(|v| !v.is_empty());

    let (name, mut kind, mut group) = match (
        non_empty(annotations::ISSUER),
        non_empty(annotations::CLUSTER_ISSUER),
    ) {
        (Some(_), Some(_)) => {
            return Err(ShimError::BadConfig(format!(
                "both {} and {} annotations are set, only one may be used",
                annotations::ISSUER,
                annotations::CLUSTER_ISSUER
            )))
        }
        (Some(name), None) => (name.to_string(), ISSUER_KIND.to_string(), GROUP.to_string()),
        (None, Some(name)) => (name.to_string(), CLUSTER_ISSUER_KIND.to_string(), GROUP.to_string()),
        (None, None) => (
            defaults.issuer_name.clone(),
            defaults.issuer_kind.clone(),
            defaults.issuer_group.clone(),
        ),
    };

    if let Some(k) = non_empty(annotations::ISSUER_KIND) {
        kind = k.to_string();
    }
    if let Some(g) = non_empty(annotations::ISSUER_GROUP) {
        group = g.to_string();
    }

    if name.is_empty() {
        return Err(ShimError::BadConfig(
            "no issuer annotation found and no default issuer configured".to_string(),
        ));
    }

    Ok(IssuerRef {
        name,
        kind: Some(kind),
        group: Some(group),
    })
}

/// Spec fields taken from the object's annotations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertificateOptions {
    pub common_name: Option<String>,
    pub duration: Option<String>,
    pub renew_before: Option<String>,
    pub usages: Vec<String>,
}

impl CertificateOptions {
    pub fn from_object(obj: &TriggerObject) -> Result<Self> {
        let owned = |key: &str| obj.annotation(key).filter(|v| !v.is_empty()).map(String::from);

        let mut usages = Vec::new();
        if let Some(raw) = obj.annotation(annotations::USAGES) {
            for usage in raw.split(',').map(str::trim).filter(|u| !u.is_empty()) {
                if !KNOWN_KEY_USAGES.contains(&usage) {
                    return Err(ShimError::BadConfig(format!(
                        "{} annotation contains unknown key usage {:?}",
                        annotations::USAGES,
                        usage
                    )));
                }
                usages.push(usage.to_string());
            }
        }

        Ok(Self {
            common_name: owned(annotations::COMMON_NAME),
            duration: owned(annotations::DURATION),
            renew_before: owned(annotations::RENEW_BEFORE),
            usages,
        })
    }
}

/// Bindings that share a secret collapse into one, keeping host order of first appearance
fn merge_bindings(bindings: Vec<TlsBinding>) -> Vec<TlsBinding> {
    let mut merged: Vec<TlsBinding> = Vec::new();
    for binding in bindings {
        match merged.iter_mut().find(|b| b.secret_name == binding.secret_name) {
            Some(existing) => {
                for host in binding.hosts {
                    if !existing.hosts.contains(&host) {
                        existing.hosts.push(host);
                    }
                }
            }
            None => {
                let mut hosts: Vec<String> = Vec::new();
                for host in binding.hosts {
                    if !hosts.contains(&host) {
                        hosts.push(host);
                    }
                }
                merged.push(TlsBinding {
                    secret_name: binding.secret_name,
                    hosts,
                });
            }
        }
    }
    merged
}

/// Desired certificates for `obj`, plus notes for the bindings that had to be skipped.
/// `acme_edit_in_place` is only honoured for ingresses.
pub fn build_certificates(
    obj: &TriggerObject,
    issuer_ref: &IssuerRef,
    options: &CertificateOptions,
    acme_edit_in_place: bool,
) -> (Vec<Certificate>, Vec<String>) {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();
    for binding in obj.tls_bindings() {
        match binding {
            Ok(binding) => valid.push(binding),
            Err(note) => skipped.push(note),
        }
    }

    let mut extra_annotations = BTreeMap::new();
    if let TriggerObject::Ingress(_) = obj {
        if acme_edit_in_place {
            extra_annotations.insert(annotations::OVERRIDE_INGRESS_NAME.to_string(), obj.name());
        }
        if let Some(class) = obj.annotation(annotations::INGRESS_CLASS) {
            extra_annotations.insert(annotations::INGRESS_CLASS.to_string(), class.to_string());
        }
    }

    let certificates = merge_bindings(valid)
        .into_iter()
        .map(|binding| {
            let mut crt = Certificate::new(
                &binding.secret_name,
                CertificateSpec {
                    secret_name: binding.secret_name.clone(),
                    dns_names: binding.hosts,
                    issuer_ref: issuer_ref.clone(),
                    common_name: options.common_name.clone(),
                    duration: options.duration.clone(),
                    renew_before: options.renew_before.clone(),
                    usages: options.usages.clone(),
                },
            );
            crt.metadata.namespace = Some(obj.namespace());
            crt.metadata.owner_references = obj.controller_owner_ref().map(|r| vec![r]);
            if !extra_annotations.is_empty() {
                crt.metadata.annotations = Some(extra_annotations.clone());
            }
            crt
        })
        .collect();

    (certificates, skipped)
}

/// Whether `existing` differs from `desired` in anything this controller manages
pub fn certificate_needs_update(existing: &Certificate, desired: &Certificate) -> bool {
    if existing.spec != desired.spec {
        return true;
    }
    MANAGED_ANNOTATIONS
        .iter()
        .any(|key| existing.annotations().get(*key) != desired.annotations().get(*key))
}

/// `existing` with the desired spec and managed annotations, keeping everything else
fn updated_certificate(existing: &Certificate, desired: &Certificate) -> Certificate {
    let mut updated = existing.clone();
    updated.spec = desired.spec.clone();
    let current = updated.annotations_mut();
    for key in MANAGED_ANNOTATIONS {
        match desired.annotations().get(*key) {
            Some(value) => {
                current.insert(key.to_string(), value.clone());
            }
            None => {
                current.remove(*key);
            }
        }
    }
    updated
}

impl Controller {
    #[instrument(skip(self, obj), fields(controller = self.name, object = %obj.key()))]
    pub async fn sync(&self, obj: &TriggerObject) -> Result<()> {
        if !should_sync(obj, &self.defaults.auto_certificate_annotations) {
            debug!("{} is not annotated for certificates, skipping", obj.kind());
            return Ok(());
        }

        let issuer_ref = match issuer_for_object(obj, &self.defaults) {
            Ok(issuer_ref) => issuer_ref,
            Err(ShimError::BadConfig(note)) => return self.bad_config(obj, note).await,
            Err(e) => return Err(e),
        };

        let is_cert_manager = issuer_ref.group.as_deref().map_or(true, |g| g.is_empty() || g == GROUP);
        if is_cert_manager
            && issuer_ref.kind.as_deref() == Some(CLUSTER_ISSUER_KIND)
            && !self.helper.cluster_issuers_available()
        {
            let note = format!(
                "{} {:?} cannot be used while watching namespace {:?} only",
                CLUSTER_ISSUER_KIND,
                issuer_ref.name,
                self.namespace.as_deref().unwrap_or_default()
            );
            return self.bad_config(obj, note).await;
        }

        let options = match CertificateOptions::from_object(obj) {
            Ok(options) => options,
            Err(ShimError::BadConfig(note)) => return self.bad_config(obj, note).await,
            Err(e) => return Err(e),
        };

        let acme_edit_in_place = self.acme_edit_in_place(obj, &issuer_ref)?;
        let (desired, skipped) = build_certificates(obj, &issuer_ref, &options, acme_edit_in_place);
        for note in skipped {
            self.recorder.warning(obj, reasons::BAD_CONFIG, note).await;
        }

        for crt in desired {
            self.apply(obj, crt).await?;
        }
        Ok(())
    }

    /// Edit-in-place only applies to ingresses whose issuer solves ACME challenges
    fn acme_edit_in_place(&self, obj: &TriggerObject, issuer_ref: &IssuerRef) -> Result<bool> {
        if !matches!(obj, TriggerObject::Ingress(_))
            || obj.annotation(annotations::EDIT_IN_PLACE) != Some("true")
        {
            return Ok(false);
        }
        match self.helper.get_generic_issuer(issuer_ref, &obj.namespace()) {
            Ok(issuer) => Ok(issuer.is_acme()),
            // issuers from other groups are opaque to us
            Err(ShimError::BadConfig(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn apply(&self, obj: &TriggerObject, desired: Certificate) -> Result<()> {
        let namespace = obj.namespace();
        let name = desired.name_any();
        let api: Api<Certificate> = Api::namespaced(self.client.clone(), &namespace);

        let existing = match self.certificates.get(&namespace, &name) {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => {
                info!("Creating Certificate {}/{}", namespace, name);
                api.create(&PostParams::default(), &desired).await?;
                self.recorder
                    .normal(
                        obj,
                        reasons::CREATE_CERTIFICATE,
                        format!("Successfully created Certificate {:?}", name),
                    )
                    .await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let owned = obj.uid().is_some_and(|uid| existing.is_controlled_by(&uid));
        if !owned {
            let note = format!(
                "Certificate resource {:?} already exists and is not owned by {} {:?}",
                name,
                obj.kind(),
                obj.name()
            );
            return self.bad_config(obj, note).await;
        }

        if !certificate_needs_update(&existing, &desired) {
            debug!("Certificate {}/{} is up to date", namespace, name);
            return Ok(());
        }

        info!("Updating Certificate {}/{}", namespace, name);
        let updated = updated_certificate(&existing, &desired);
        api.replace(&name, &PostParams::default(), &updated).await?;
        self.recorder
            .normal(
                obj,
                reasons::UPDATE_CERTIFICATE,
                format!("Successfully updated Certificate {:?}", name),
            )
            .await;
        Ok(())
    }

    /// Record a configuration problem. Nothing is retried until the object changes.
    async fn bad_config(&self, obj: &TriggerObject, note: String) -> Result<()> {
        self.recorder.warning(obj, reasons::BAD_CONFIG, note).await;
        Ok(())
    }
}
