// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::token;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Projected identity document presented as the client assertion
    pub token_file_path: PathBuf,
    /// Base URL of the identity provider, tenant is appended
    pub authority_host: String,
    pub token_scope: String,
    /// How long before token expiry the binding is reconciled again
    pub refresh_buffer: Duration,
    /// Per-request timeout for identity provider and registry calls
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            token_file_path: PathBuf::from(token::DEFAULT_TOKEN_FILE_PATH),
            authority_host: token::DEFAULT_AUTHORITY_HOST.to_string(),
            token_scope: token::DEFAULT_SCOPE.to_string(),
            refresh_buffer: Duration::from_secs(token::DEFAULT_REFRESH_BUFFER_SECS),
            http_timeout: Duration::from_secs(token::DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let token_file_path = lookup("TOKEN_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.token_file_path);
        let authority_host = lookup("AZURE_AUTHORITY_HOST").unwrap_or(defaults.authority_host);
        let token_scope = lookup("TOKEN_SCOPE").unwrap_or(defaults.token_scope);
        let refresh_buffer = match lookup("TOKEN_REFRESH_BUFFER_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("TOKEN_REFRESH_BUFFER_SECS is not a number: {raw}"))?,
            ),
            None => defaults.refresh_buffer,
        };
        let http_timeout = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("HTTP_TIMEOUT_SECS is not a number: {raw}"))?,
            ),
            None => defaults.http_timeout,
        };

        Ok(Config {
            token_file_path,
            authority_host,
            token_scope,
            refresh_buffer,
            http_timeout,
        })
    }
}
