// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Docker config document stored in the pull secret

use crate::auth::token::AccessToken;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct DockerConfig {
    pub auths: BTreeMap<String, DockerAuth>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct DockerAuth {
    pub identitytoken: String,
}

/// Render `{"auths": {"<registry>": {"identitytoken": "<token>"}}}`
pub fn render_docker_config(registry: &str, token: &AccessToken) -> Result<String> {
    let config = DockerConfig {
        auths: BTreeMap::from([(
            registry.to_string(),
            DockerAuth {
                identitytoken: token.as_str().to_string(),
            },
        )]),
    };
    Ok(serde_json::to_string(&config)?)
}

pub fn parse_docker_config(raw: &[u8]) -> Result<DockerConfig> {
    Ok(serde_json::from_slice(raw)?)
}
