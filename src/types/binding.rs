// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{pull_secret, DEFAULT_SERVICE_ACCOUNT_NAME, FINALIZER_NAME};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Keeps an ACR pull secret refreshed for a workload identity and attaches it
/// to a service account in the binding's namespace.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "wi-acrpull.microsoft.com",
    version = "v1",
    kind = "WIPullBinding",
    plural = "wipullbindings"
)]
#[kube(namespaced)]
#[kube(status = "WIPullBindingStatus")]
#[kube(printcolumn = r#"{"name":"Server","type":"string","jsonPath":".spec.acrServer"}"#)]
#[kube(printcolumn = r#"{"name":"Expires","type":"date","jsonPath":".status.tokenExpirationTime"}"#)]
#[serde(rename_all = "camelCase")]
pub struct WIPullBindingSpec {
    /// Full registry server name, for example test.azurecr.io
    pub acr_server: String,
    /// Client ID of the workload identity used to authenticate with ACR
    #[serde(default, rename = "servicePrincipalClientID")]
    pub service_principal_client_id: String,
    /// Tenant of the workload identity (ignored when the client ID is set)
    #[serde(default, rename = "servicePrincipalTenantID")]
    pub service_principal_tenant_id: String,
    /// Service account to attach the pull secret to. Defaults to the
    /// namespace's default service account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
}

/// Observed state. Written by the controller only, never read back as input.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WIPullBindingStatus {
    /// When the ACR token was last refreshed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_token_refresh_time: Option<Time>,
    /// Expiry of the token currently stored in the pull secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expiration_time: Option<Time>,
    /// Last error raised while refreshing the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WIPullBinding {
    /// Service account targeted by this binding
    pub fn service_account_name(&self) -> &str {
        self.spec
            .service_account_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SERVICE_ACCOUNT_NAME)
    }

    /// Name of the pull secret managed for this binding
    pub fn pull_secret_name(&self) -> String {
        pull_secret_name(&self.name_any())
    }

    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == FINALIZER_NAME)
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

/// Derive the pull secret name for a binding. Lookups and owner matching
/// depend on this being stable across releases.
pub fn pull_secret_name(binding_name: &str) -> String {
    format!("{}{}", binding_name, pull_secret::NAME_SUFFIX)
}
