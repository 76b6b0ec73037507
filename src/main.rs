// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wi_acrpull::auth::AcrTokenExchanger;
use wi_acrpull::config::Config;
use wi_acrpull::kubernetes::wait_for_binding_crd;
use wi_acrpull::reconcilers::{Context, PullBindingReconciler};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting wi-acrpull controller");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: token_file_path={}, refresh_buffer={}s",
        config.token_file_path.display(),
        config.refresh_buffer.as_secs()
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for WIPullBinding CRD to become available...");
    wait_for_binding_crd(&client).await?;

    let exchanger = Arc::new(AcrTokenExchanger::new(&config)?);
    let reconciler = PullBindingReconciler::new(Context::new(client, exchanger, config));

    info!("Starting binding reconciler...");
    reconciler.run().await
}
