// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::constants::API_GROUP;
use crate::error::Result;
use crate::types::WIPullBinding;
use kube::{discovery::Discovery, Client, Resource};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Next polling interval, doubling up to the cap
pub fn next_interval(interval: u64) -> u64 {
    (interval * 2).min(POLL_MAX_INTERVAL_SECS)
}

/// Wait for the WIPullBinding CRD to be installed.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_binding_crd(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match check_binding_crd_exists(client).await {
            Ok(true) => {
                info!("WIPullBinding CRD ({}/v1) is available", API_GROUP);
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "WIPullBinding CRD ({}/v1) not yet available, waiting {} seconds...",
                    API_GROUP, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for WIPullBinding CRD: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;
        interval = next_interval(interval);
    }
}

async fn check_binding_crd_exists(client: &Client) -> Result<bool> {
    let discovery = Discovery::new(client.clone())
        .filter(&[API_GROUP])
        .run()
        .await?;

    let kind = WIPullBinding::kind(&());
    let version = WIPullBinding::version(&());
    for group in discovery.groups() {
        if group.name() == API_GROUP {
            for (ar, _) in group.recommended_resources() {
                if ar.kind == kind && ar.version == version {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}
