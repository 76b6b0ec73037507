// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Binding status writes

use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::types::{WIPullBinding, WIPullBindingStatus};
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{
    api::{Patch, PatchParams},
    Api,
};
use serde_json::json;
use tracing::instrument;

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    }
}

/// Record an error. Expiry and refresh time stay as they were, so the status
/// keeps describing the credential that is still in the secret.
#[instrument(skip(api))]
pub async fn set_error_status(api: &Api<WIPullBinding>, name: &str, message: &str) -> Result<()> {
    let patch = json!({ "status": { "error": message } });
    api.patch_status(name, &patch_params(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

pub fn success_status(expiry: DateTime<Utc>, now: DateTime<Utc>) -> WIPullBindingStatus {
    WIPullBindingStatus {
        last_token_refresh_time: Some(Time(now)),
        token_expiration_time: Some(Time(expiry)),
        error: None,
    }
}

/// Replace the whole status after a successful refresh, clearing any error
#[instrument(skip(api))]
pub async fn set_success_status(
    api: &Api<WIPullBinding>,
    name: &str,
    expiry: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    let status = success_status(expiry, now);
    let patch = json!({
        "status": {
            "lastTokenRefreshTime": status.last_token_refresh_time,
            "tokenExpirationTime": status.token_expiration_time,
            "error": null
        }
    });
    api.patch_status(name, &patch_params(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}
