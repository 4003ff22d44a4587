// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Controller names, used for logging, queue names and the enabled-controllers list
pub const INGRESS_SHIM_CONTROLLER_NAME: &str = "ingress-shim";
pub const GATEWAY_SHIM_CONTROLLER_NAME: &str = "gateway-shim";

/// The reporting component for events
pub const OPERATOR_NAME: &str = "certshim";

/// Annotation keys read from trigger objects and written to certificates
pub mod annotations {
    /// Name of a namespaced Issuer to use
    pub const ISSUER: &str = "cert-manager.io/issuer";
    /// Name of a ClusterIssuer to use
    pub const CLUSTER_ISSUER: &str = "cert-manager.io/cluster-issuer";
    /// Overrides the issuer kind, for external issuers
    pub const ISSUER_KIND: &str = "cert-manager.io/issuer-kind";
    /// Overrides the issuer group, for external issuers
    pub const ISSUER_GROUP: &str = "cert-manager.io/issuer-group";

    pub const COMMON_NAME: &str = "cert-manager.io/common-name";
    pub const DURATION: &str = "cert-manager.io/duration";
    pub const RENEW_BEFORE: &str = "cert-manager.io/renew-before";
    /// Comma separated list of key usages
    pub const USAGES: &str = "cert-manager.io/usages";

    /// When "true" the ACME HTTP01 solver edits the ingress instead of creating one
    pub const EDIT_IN_PLACE: &str = "acme.cert-manager.io/http01-edit-in-place";
    /// Set on the Certificate to point the solver at the ingress to edit
    pub const OVERRIDE_INGRESS_NAME: &str = "acme.cert-manager.io/http01-override-ingress-name";
    pub const INGRESS_CLASS: &str = "acme.cert-manager.io/http01-ingress-class";

    /// Default auto-certificate annotation
    pub const TLS_ACME: &str = "kubernetes.io/tls-acme";
}

/// cert-manager API group and issuer kinds
pub mod certmanager {
    pub const GROUP: &str = "cert-manager.io";
    pub const ISSUER_KIND: &str = "Issuer";
    pub const CLUSTER_ISSUER_KIND: &str = "ClusterIssuer";
}

/// Gateway API discovery
pub mod gateway {
    pub const GROUP_VERSION: &str = "gateway.networking.k8s.io/v1";
    pub const TLS_MODE_PASSTHROUGH: &str = "Passthrough";
    pub const SECRET_KIND: &str = "Secret";
}

/// Event reasons published against trigger objects
pub mod reasons {
    pub const BAD_CONFIG: &str = "BadConfig";
    pub const CREATE_CERTIFICATE: &str = "CreateCertificate";
    pub const UPDATE_CERTIFICATE: &str = "UpdateCertificate";
}

/// Work queue rate limiting
pub mod queue {
    /// First retry delay for a failing item, in milliseconds
    pub const BASE_DELAY_MS: u64 = 5_000;
    /// Cap on the per-item retry delay, in milliseconds
    pub const MAX_DELAY_MS: u64 = 300_000;
}

/// How often the runner checks the sync predicates before starting workers
pub const CACHE_SYNC_POLL_MILLIS: u64 = 100;

/// Key usages accepted in the usages annotation
pub const KNOWN_KEY_USAGES: &[&str] = &[
    "signing",
    "digital signature",
    "content commitment",
    "key encipherment",
    "key agreement",
    "data encipherment",
    "cert sign",
    "crl sign",
    "encipher only",
    "decipher only",
    "any",
    "server auth",
    "client auth",
    "code signing",
    "email protection",
    "s/mime",
    "ipsec end system",
    "ipsec tunnel",
    "ipsec user",
    "timestamping",
    "ocsp signing",
    "microsoft sgc",
    "netscape sgc",
];
