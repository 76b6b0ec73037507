// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Image pull secret references on service accounts.
//!
//! A service account can be shared by many bindings, so only the reference
//! named after this binding's secret is ever added or removed. Writes go
//! through `replace` with the resourceVersion observed on read; a concurrent
//! writer makes the API server answer 409 and the reconciliation is retried
//! from a fresh read.

use crate::error::{AcrPullError, Result};
use k8s_openapi::api::core::v1::{LocalObjectReference, ServiceAccount};
use kube::{api::PostParams, Api};
use tracing::{debug, info, instrument};

pub fn has_pull_secret_ref(account: &ServiceAccount, secret_name: &str) -> bool {
    account
        .image_pull_secrets
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.name == secret_name))
}

/// Append the reference unless present. Returns whether the account changed.
pub fn append_pull_secret_ref(account: &mut ServiceAccount, secret_name: &str) -> bool {
    if has_pull_secret_ref(account, secret_name) {
        return false;
    }
    account
        .image_pull_secrets
        .get_or_insert_with(Vec::new)
        .push(LocalObjectReference {
            name: secret_name.to_string(),
        });
    true
}

/// Drop the reference with exactly this name. Returns whether the account changed.
pub fn strip_pull_secret_ref(account: &mut ServiceAccount, secret_name: &str) -> bool {
    let Some(refs) = account.image_pull_secrets.as_mut() else {
        return false;
    };
    let before = refs.len();
    refs.retain(|r| r.name != secret_name);
    refs.len() != before
}

/// Make sure the service account references the pull secret
#[instrument(skip(api))]
pub async fn ensure_pull_secret_ref(
    api: &Api<ServiceAccount>,
    account_name: &str,
    secret_name: &str,
) -> Result<bool> {
    let mut account = api.get(account_name).await?;

    if !append_pull_secret_ref(&mut account, secret_name) {
        debug!(
            "Service account {} already references {}",
            account_name, secret_name
        );
        return Ok(false);
    }

    info!(
        "Adding image pull secret {} to service account {}",
        secret_name, account_name
    );
    api.replace(account_name, &PostParams::default(), &account)
        .await?;
    Ok(true)
}

/// Remove the pull secret reference. A missing service account counts as
/// already cleaned up.
#[instrument(skip(api))]
pub async fn remove_pull_secret_ref(
    api: &Api<ServiceAccount>,
    account_name: &str,
    secret_name: &str,
) -> Result<bool> {
    let mut account = match api.get(account_name).await.map_err(AcrPullError::from) {
        Ok(account) => account,
        Err(e) if e.is_not_found() => {
            info!(
                "Service account {} not found, nothing to clean up",
                account_name
            );
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if !strip_pull_secret_ref(&mut account, secret_name) {
        debug!(
            "Service account {} does not reference {}",
            account_name, secret_name
        );
        return Ok(false);
    }

    info!(
        "Removing image pull secret {} from service account {}",
        secret_name, account_name
    );
    api.replace(account_name, &PostParams::default(), &account)
        .await?;
    Ok(true)
}
