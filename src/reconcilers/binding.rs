// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! WIPullBinding reconciler - keeps the pull secret and service account
//! reference of every binding current and requeues ahead of token expiry.

use crate::auth::{render_docker_config, TokenExchanger};
use crate::config::Config;
use crate::constants::{backoff, labels, OPERATOR_NAME};
use crate::error::{AcrPullError, Result};
use crate::kubernetes::{
    ensure_pull_secret_ref, ensure_registered, set_error_status, set_success_status,
    sync_pull_secret, teardown, FinalizerState,
};
use crate::types::WIPullBinding;
use chrono::{DateTime, Utc};
use futures::{future, StreamExt};
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use kube::{
    runtime::{
        controller::Action, predicates, reflector, reflector::ObjectRef, watcher,
        Controller, WatchStreamExt,
    },
    Api, Client, ResourceExt,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Shared state handed to every reconciliation
pub struct Context {
    pub client: Client,
    pub exchanger: Arc<dyn TokenExchanger>,
    pub config: Config,
    /// Consecutive failures per binding, drives the error backoff
    failures: Mutex<HashMap<ObjectRef<WIPullBinding>, u32>>,
}

impl Context {
    pub fn new(client: Client, exchanger: Arc<dyn TokenExchanger>, config: Config) -> Self {
        Self {
            client,
            exchanger,
            config,
            failures: Mutex::new(HashMap::new()),
        }
    }

    fn record_failure(&self, key: ObjectRef<WIPullBinding>) -> u32 {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let count = failures.entry(key).or_insert(0);
        *count += 1;
        *count
    }

    fn reset_failures(&self, key: &ObjectRef<WIPullBinding>) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

pub struct PullBindingReconciler {
    ctx: Arc<Context>,
}

impl PullBindingReconciler {
    pub fn new(ctx: Context) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let bindings: Api<WIPullBinding> = Api::all(self.ctx.client.clone());

        // Only spec changes and deletion bump the generation; status writes
        // must not trigger another token refresh.
        let (reader, writer) = reflector::store();
        let stream = watcher(bindings, watcher::Config::default())
            .default_backoff()
            .reflect(writer)
            .applied_objects()
            .predicate_filter(predicates::generation);

        // Our own secret writes are ignored; a deleted pull secret wakes its
        // binding so it is recreated right away.
        let secrets: Api<Secret> = Api::all(self.ctx.client.clone());
        let managed = format!("{}={}", labels::MANAGED_BY, OPERATOR_NAME);
        let deleted_secrets = watcher(secrets, watcher::Config::default().labels(&managed))
            .default_backoff()
            .filter_map(|event| future::ready(deleted_object(event)));

        Controller::for_stream(stream, reader)
            .owns_stream(deleted_secrets)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.ctx)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled binding: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        info!("Binding reconciler stopped");
        Ok(())
    }
}

/// Keep only deletions from a watch stream
pub fn deleted_object<K>(
    event: std::result::Result<watcher::Event<K>, watcher::Error>,
) -> Option<std::result::Result<K, watcher::Error>> {
    match event {
        Ok(watcher::Event::Delete(obj)) => Some(Ok(obj)),
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    }
}

/// Delay until the next refresh: `max(0, expiry - now - buffer)`
pub fn requeue_delay(expiry: DateTime<Utc>, now: DateTime<Utc>, buffer: Duration) -> Duration {
    (expiry - now)
        .to_std()
        .ok()
        .and_then(|remaining| remaining.checked_sub(buffer))
        .unwrap_or(Duration::ZERO)
}

/// Exponential backoff for the n-th consecutive failure, starting at 1
pub fn error_backoff(failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    let secs = backoff::BASE_SECS.saturating_mul(1 << exp);
    Duration::from_secs(secs.min(backoff::MAX_SECS))
}

async fn reconcile(binding: Arc<WIPullBinding>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = binding
        .namespace()
        .ok_or(AcrPullError::MissingObjectKey(".metadata.namespace"))?;
    let name = binding.name_any();

    let action = reconcile_binding(&ctx, &namespace, &name, Utc::now()).await?;
    ctx.reset_failures(&ObjectRef::from_obj(&*binding));
    Ok(action)
}

/// One pass of the control loop for the binding `namespace/name`.
#[instrument(skip(ctx, now), fields(binding = %format!("{}/{}", namespace, name)))]
pub async fn reconcile_binding(
    ctx: &Context,
    namespace: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Action> {
    let bindings: Api<WIPullBinding> = Api::namespaced(ctx.client.clone(), namespace);
    let accounts: Api<ServiceAccount> = Api::namespaced(ctx.client.clone(), namespace);

    let Some(binding) = bindings.get_opt(name).await? else {
        info!("Binding not found, it is being or has been deleted");
        return Ok(Action::await_change());
    };

    let service_account_name = binding.service_account_name().to_string();

    let binding = match FinalizerState::of(&binding) {
        FinalizerState::Released => {
            debug!("Binding is being deleted and holds no finalizer of ours");
            return Ok(Action::await_change());
        }
        FinalizerState::CleanupPending => {
            teardown(&bindings, &accounts, &binding).await?;
            return Ok(Action::await_change());
        }
        FinalizerState::Unregistered => ensure_registered(&bindings, &binding).await?,
        FinalizerState::Registered => binding,
    };

    let spec = &binding.spec;
    let (token, expiry) = match ctx
        .exchanger
        .exchange(
            &spec.service_principal_client_id,
            &spec.service_principal_tenant_id,
            &spec.acr_server,
        )
        .await
        .and_then(|token| token.expiry().map(|expiry| (token, expiry)))
    {
        Ok(exchanged) => exchanged,
        Err(e) => {
            error!("Failed to get ACR access token: {}", e);
            if let Err(status_err) = set_error_status(&bindings, name, &e.to_string()).await {
                error!("Failed to update error status: {}", status_err);
            }
            return Err(e);
        }
    };

    let docker_config = render_docker_config(&spec.acr_server, &token)?;

    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), namespace);
    let synced = sync_pull_secret(&secrets, &binding, &docker_config).await?;
    debug!("Pull secret sync result: {:?}", synced);

    ensure_pull_secret_ref(&accounts, &service_account_name, &binding.pull_secret_name()).await?;

    set_success_status(&bindings, name, expiry, now).await?;

    let delay = requeue_delay(expiry, now, ctx.config.refresh_buffer);
    info!(
        "Token refreshed, expires at {}, next refresh in {}s",
        expiry,
        delay.as_secs()
    );
    Ok(Action::requeue(delay))
}

fn error_policy(binding: Arc<WIPullBinding>, error: &AcrPullError, ctx: Arc<Context>) -> Action {
    let failures = ctx.record_failure(ObjectRef::from_obj(&*binding));
    let delay = error_backoff(failures);
    error!(
        "Reconciliation of {}/{} failed ({} in a row), retrying in {}s: {}",
        binding.namespace().unwrap_or_default(),
        binding.name_any(),
        failures,
        delay.as_secs(),
        error
    );
    Action::requeue(delay)
}
