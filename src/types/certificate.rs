// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "cert-manager.io", version = "v1", kind = "Certificate")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    pub secret_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    pub issuer_ref: IssuerRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renew_before: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<String>,
}

/// Reference to the issuer that signs a certificate
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Certificate {
    /// Check whether the object with this uid is the controlling owner
    pub fn is_controlled_by(&self, uid: &str) -> bool {
        self.owner_references()
            .iter()
            .any(|r| r.controller == Some(true) && r.uid == uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use kube::api::ObjectMeta;

    fn make_certificate(owners: Vec<OwnerReference>) -> Certificate {
        Certificate {
            metadata: ObjectMeta {
                name: Some("web-tls".to_string()),
                namespace: Some("ns1".to_string()),
                owner_references: Some(owners),
                ..Default::default()
            },
            spec: CertificateSpec::default(),
        }
    }

    fn make_owner(uid: &str, controller: Option<bool>) -> OwnerReference {
        OwnerReference {
            api_version: "networking.k8s.io/v1".to_string(),
            kind: "Ingress".to_string(),
            name: "web".to_string(),
            uid: uid.to_string(),
            controller,
            block_owner_deletion: None,
        }
    }

    #[test]
    fn test_is_controlled_by_controller_owner() {
        let crt = make_certificate(vec![make_owner("uid-1", Some(true))]);
        assert!(crt.is_controlled_by("uid-1"));
        assert!(!crt.is_controlled_by("uid-2"));
    }

    #[test]
    fn test_is_controlled_by_ignores_non_controller_owner() {
        let crt = make_certificate(vec![make_owner("uid-1", None)]);
        assert!(!crt.is_controlled_by("uid-1"));
    }

    #[test]
    fn test_spec_serializes_camel_case() {
        let spec = CertificateSpec {
            secret_name: "web-tls".to_string(),
            dns_names: vec!["example.com".to_string()],
            issuer_ref: IssuerRef {
                name: "letsencrypt".to_string(),
                kind: Some("ClusterIssuer".to_string()),
                group: Some("cert-manager.io".to_string()),
            },
            renew_before: Some("360h".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["secretName"], "web-tls");
        assert_eq!(json["dnsNames"][0], "example.com");
        assert_eq!(json["issuerRef"]["kind"], "ClusterIssuer");
        assert_eq!(json["renewBefore"], "360h");
        assert!(json.get("usages").is_none());
        assert!(json.get("commonName").is_none());
    }
}
