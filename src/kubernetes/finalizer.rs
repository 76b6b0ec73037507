// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Two phase deletion of bindings.
//!
//! The finalizer is recorded before any secret or service account change is
//! made, and removed only after the service account reference is gone. The
//! pull secret itself is garbage collected through its owner reference once
//! the binding disappears.

use crate::constants::{FINALIZER_NAME, OPERATOR_NAME};
use crate::error::Result;
use crate::kubernetes::service_account::remove_pull_secret_ref;
use crate::types::WIPullBinding;
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::{
    api::{Patch, PatchParams},
    Api, ResourceExt,
};
use serde_json::json;
use tracing::{debug, info, instrument};

/// Where a binding stands in the deletion protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerState {
    Unregistered,
    Registered,
    CleanupPending,
    /// Being deleted and nothing of ours left to clean
    Released,
}

impl FinalizerState {
    pub fn of(binding: &WIPullBinding) -> Self {
        match (binding.is_being_deleted(), binding.has_finalizer()) {
            (false, false) => FinalizerState::Unregistered,
            (false, true) => FinalizerState::Registered,
            (true, true) => FinalizerState::CleanupPending,
            (true, false) => FinalizerState::Released,
        }
    }
}

/// Merge patch replacing the finalizer list. The observed resourceVersion is
/// included so the API server rejects the write if the binding changed since.
fn finalizer_patch(binding: &WIPullBinding, finalizers: Vec<String>) -> serde_json::Value {
    let mut patch = json!({ "metadata": { "finalizers": finalizers } });
    if let Some(rv) = binding.resource_version() {
        patch["metadata"]["resourceVersion"] = json!(rv);
    }
    patch
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    }
}

/// Record the finalizer if it is not there yet. Returns the binding as
/// persisted.
#[instrument(skip(api, binding), fields(binding = %binding.name_any()))]
pub async fn ensure_registered(
    api: &Api<WIPullBinding>,
    binding: &WIPullBinding,
) -> Result<WIPullBinding> {
    if binding.has_finalizer() {
        return Ok(binding.clone());
    }

    let mut finalizers = binding.finalizers().to_vec();
    finalizers.push(FINALIZER_NAME.to_string());

    info!("Adding finalizer {}", FINALIZER_NAME);
    let patched = api
        .patch(
            &binding.name_any(),
            &patch_params(),
            &Patch::Merge(finalizer_patch(binding, finalizers)),
        )
        .await?;
    Ok(patched)
}

/// Undo the service account reference, then drop the finalizer so the API
/// server can finish deleting the binding.
#[instrument(skip(api, accounts, binding), fields(binding = %binding.name_any()))]
pub async fn teardown(
    api: &Api<WIPullBinding>,
    accounts: &Api<ServiceAccount>,
    binding: &WIPullBinding,
) -> Result<()> {
    if !binding.has_finalizer() {
        debug!("Finalizer already removed, nothing to clean up");
        return Ok(());
    }

    remove_pull_secret_ref(
        accounts,
        binding.service_account_name(),
        &binding.pull_secret_name(),
    )
    .await?;

    let finalizers: Vec<String> = binding
        .finalizers()
        .iter()
        .filter(|f| f.as_str() != FINALIZER_NAME)
        .cloned()
        .collect();

    info!("Removing finalizer {}", FINALIZER_NAME);
    api.patch(
        &binding.name_any(),
        &patch_params(),
        &Patch::Merge(finalizer_patch(binding, finalizers)),
    )
    .await?;
    Ok(())
}
