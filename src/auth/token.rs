// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Opaque ACR refresh token with a decodable expiry.

use crate::error::{AcrPullError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// A registry refresh token. The value is a signed JWT; only its `exp`
/// claim is ever inspected and the signature is not verified.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the expiry from the token's `exp` claim
    pub fn expiry(&self) -> Result<DateTime<Utc>> {
        let payload = self
            .0
            .split('.')
            .nth(1)
            .ok_or_else(|| AcrPullError::TokenDecode("token is not a JWT".to_string()))?;

        let raw = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AcrPullError::TokenDecode(format!("invalid payload encoding: {}", e)))?;

        let claims: Claims = serde_json::from_slice(&raw)
            .map_err(|e| AcrPullError::TokenDecode(format!("invalid claims: {}", e)))?;

        DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AcrPullError::TokenDecode(format!("exp out of range: {}", claims.exp)))
    }
}

// Keep the token out of logs
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[cfg(test)]
pub(crate) fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp, "sub": "acr" }).to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, claims)
}
