// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes API discovery helpers.

pub mod discovery;

pub use discovery::{ensure_gateway_api_installed, resources_for_group_version};
