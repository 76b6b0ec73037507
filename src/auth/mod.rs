// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Workload identity to ACR token exchange and docker config rendering.

pub mod docker_config;
pub mod exchange;
pub mod token;

pub use docker_config::{parse_docker_config, render_docker_config};
pub use exchange::{AcrTokenExchanger, TokenExchanger};
pub use token::AccessToken;
