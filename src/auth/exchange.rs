// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Two step token exchange: identity document -> bearer token -> ACR
//! refresh token. No retries happen here; a failed exchange fails the
//! reconciliation and the controller backs off.

use crate::auth::token::AccessToken;
use crate::config::Config;
use crate::constants::token::CLIENT_ASSERTION_TYPE;
use crate::error::{AcrPullError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, instrument};
use url::Url;

/// Exchanges a workload identity for a registry token
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(
        &self,
        client_id: &str,
        tenant_id: &str,
        registry: &str,
    ) -> Result<AccessToken>;
}

#[derive(Deserialize)]
struct BearerTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    refresh_token: String,
}

pub struct AcrTokenExchanger {
    http: reqwest::Client,
    token_file_path: PathBuf,
    authority_host: String,
    scope: String,
    registry_scheme: String,
}

impl AcrTokenExchanger {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            http,
            token_file_path: config.token_file_path.clone(),
            authority_host: config.authority_host.clone(),
            scope: config.token_scope.clone(),
            registry_scheme: "https".to_string(),
        })
    }

    /// Talk to the registry over a different scheme, used against local mock servers
    pub fn with_registry_scheme(mut self, scheme: &str) -> Self {
        self.registry_scheme = scheme.to_string();
        self
    }

    async fn read_identity_token(&self) -> Result<String> {
        let raw = tokio::fs::read_to_string(&self.token_file_path)
            .await
            .map_err(|e| {
                AcrPullError::IdentityToken(format!(
                    "{}: {}",
                    self.token_file_path.display(),
                    e
                ))
            })?;
        Ok(raw.trim().to_string())
    }

    fn authority_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            tenant_id
        )
    }

    #[instrument(skip(self))]
    async fn acquire_bearer_token(&self, client_id: &str, tenant_id: &str) -> Result<String> {
        let assertion = self.read_identity_token().await?;

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("scope", self.scope.as_str()),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
        ];

        let resp = self
            .http
            .post(self.authority_url(tenant_id))
            .form(&params)
            .send()
            .await
            .map_err(|e| AcrPullError::TokenRequest(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AcrPullError::TokenRequest(e.to_string()))?;

        if !status.is_success() {
            return Err(AcrPullError::TokenRequest(format!(
                "identity provider returned status {}. body: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: BearerTokenResponse = serde_json::from_str(&body).map_err(|e| {
            AcrPullError::TokenRequest(format!("malformed token response: {}", e))
        })?;

        debug!("Acquired bearer token for client {}", client_id);
        Ok(parsed.access_token)
    }

    #[instrument(skip(self, bearer))]
    async fn exchange_for_acr_token(
        &self,
        tenant_id: &str,
        registry: &str,
        bearer: &str,
    ) -> Result<AccessToken> {
        let exchange_url = format!("{}://{}/oauth2/exchange", self.registry_scheme, registry);
        let parsed = Url::parse(&exchange_url).map_err(|e| {
            AcrPullError::TokenExchange(format!("failed to parse token exchange url: {}", e))
        })?;
        let service = parsed.host_str().unwrap_or(registry).to_string();

        let params = [
            ("grant_type", "access_token"),
            ("service", service.as_str()),
            ("tenant", tenant_id),
            ("access_token", bearer),
        ];

        let resp = self
            .http
            .post(parsed)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                AcrPullError::TokenExchange(format!("failed to send token exchange request: {}", e))
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            AcrPullError::TokenExchange(format!("failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(AcrPullError::TokenExchange(format!(
                "ACR token exchange endpoint returned error status: {}. body: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: ExchangeResponse = serde_json::from_str(&body).map_err(|e| {
            AcrPullError::TokenExchange(format!(
                "failed to read token exchange response: {}. response: {}",
                e, body
            ))
        })?;

        Ok(AccessToken::new(parsed.refresh_token))
    }
}

#[async_trait]
impl TokenExchanger for AcrTokenExchanger {
    async fn exchange(
        &self,
        client_id: &str,
        tenant_id: &str,
        registry: &str,
    ) -> Result<AccessToken> {
        let bearer = self.acquire_bearer_token(client_id, tenant_id).await?;
        self.exchange_for_acr_token(tenant_id, registry, &bearer).await
    }
}
