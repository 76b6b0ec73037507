// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcrPullError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to read identity token: {0}")]
    IdentityToken(String),

    #[error("Unable to acquire bearer token: {0}")]
    TokenRequest(String),

    #[error("ACR token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Failed to decode token expiry: {0}")]
    TokenDecode(String),

    #[error("Failed to build owner reference: {0}")]
    OwnerReference(String),

    #[error("Object is missing {0}")]
    MissingObjectKey(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AcrPullError {
    /// True when the error is an API server 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AcrPullError::KubeError(kube::Error::Api(err)) if err.code == 404)
    }
}

pub type Result<T> = std::result::Result<T, AcrPullError>;
