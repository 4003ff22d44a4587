// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! API capability checks done before a controller starts watching optional APIs

use crate::constants::gateway::GROUP_VERSION;
use crate::error::{Result, ShimError};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::Client;
use tracing::{debug, info};

/// Resources served for a group version, e.g. `gateway.networking.k8s.io/v1`
pub async fn resources_for_group_version(
    client: &Client,
    group_version: &str,
) -> std::result::Result<APIResourceList, kube::Error> {
    let resources = client.list_api_group_resources(group_version).await?;
    debug!(
        "Discovered {} resources for {}",
        resources.resources.len(),
        group_version
    );
    Ok(resources)
}

/// Fail unless the Gateway API is served by the cluster.
/// `controller` names the caller in the returned error.
pub async fn ensure_gateway_api_installed(client: &Client, controller: &'static str) -> Result<()> {
    let resources = match resources_for_group_version(client, GROUP_VERSION).await {
        Ok(resources) => resources,
        Err(source) => return Err(ShimError::Discovery { controller, source }),
    };

    if resources.resources.is_empty() {
        return Err(ShimError::GatewayApiNotInstalled(controller));
    }

    info!("Gateway API ({}) is available", GROUP_VERSION);
    Ok(())
}
