// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types watched or written by the controllers.

pub mod certificate;
pub mod gateway;
pub mod issuer;

pub use certificate::{Certificate, CertificateSpec, IssuerRef};
pub use gateway::Gateway;
pub use issuer::{ClusterIssuer, Issuer, IssuerSpec};
