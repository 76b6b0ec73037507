// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pull secret synchronization

use crate::constants::{labels, pull_secret, OPERATOR_NAME};
use crate::error::{AcrPullError, Result};
use crate::types::WIPullBinding;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{
    api::{ListParams, ObjectMeta, PostParams},
    Api, Resource, ResourceExt,
};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// What `sync_pull_secret` did to the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSync {
    Created,
    Updated,
    Unchanged,
}

/// Whether the secret's controller owner reference points at this binding
pub fn is_owned_by(secret: &Secret, binding: &WIPullBinding) -> bool {
    let binding_uid = binding.uid();
    secret.owner_references().iter().any(|owner| {
        owner.controller == Some(true)
            && owner.kind == WIPullBinding::kind(&())
            && owner.name == binding.name_any()
            && binding_uid.as_ref().is_none_or(|uid| uid == &owner.uid)
    })
}

/// Find the pull secret for a binding among the secrets labelled as belonging to it
pub fn find_pull_secret(secrets: Vec<Secret>, binding: &WIPullBinding) -> Option<Secret> {
    let name = binding.pull_secret_name();
    secrets
        .into_iter()
        .find(|s| s.name_any() == name && is_owned_by(s, binding))
}

fn pull_secret_labels(binding: &WIPullBinding) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::BINDING.to_string(), binding.name_any()),
        (labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
    ])
}

/// Build a new pull secret controlled by the binding
pub fn new_pull_secret(binding: &WIPullBinding, docker_config: &str) -> Result<Secret> {
    let owner = binding.controller_owner_ref(&()).ok_or_else(|| {
        AcrPullError::OwnerReference(format!(
            "binding {} has no name or uid",
            binding.name_any()
        ))
    })?;

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(binding.pull_secret_name()),
            namespace: binding.namespace(),
            labels: Some(pull_secret_labels(binding)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        type_: Some(pull_secret::SECRET_TYPE.to_string()),
        data: Some(BTreeMap::from([(
            pull_secret::DOCKER_CONFIG_KEY.to_string(),
            ByteString(docker_config.as_bytes().to_vec()),
        )])),
        ..Default::default()
    })
}

/// Overwrite the docker config in place and put back any missing label.
/// Returns false when nothing changed.
pub fn update_pull_secret(secret: &mut Secret, binding: &WIPullBinding, docker_config: &str) -> bool {
    let mut changed = false;

    let secret_labels = secret.metadata.labels.get_or_insert_with(BTreeMap::new);
    for (key, value) in pull_secret_labels(binding) {
        if secret_labels.get(&key) != Some(&value) {
            secret_labels.insert(key, value);
            changed = true;
        }
    }

    let data = secret.data.get_or_insert_with(BTreeMap::new);
    let payload = ByteString(docker_config.as_bytes().to_vec());
    if data.get(pull_secret::DOCKER_CONFIG_KEY) != Some(&payload) {
        data.insert(pull_secret::DOCKER_CONFIG_KEY.to_string(), payload);
        changed = true;
    }

    changed
}

/// Look the pull secret up through the label index, falling back to the
/// derived name for secrets that lost their label or predate it.
async fn lookup_pull_secret(api: &Api<Secret>, binding: &WIPullBinding) -> Result<Option<Secret>> {
    let lp = ListParams::default().labels(&format!("{}={}", labels::BINDING, binding.name_any()));
    let labelled = api.list(&lp).await?;
    if let Some(secret) = find_pull_secret(labelled.items, binding) {
        return Ok(Some(secret));
    }

    Ok(api
        .get_opt(&binding.pull_secret_name())
        .await?
        .filter(|secret| is_owned_by(secret, binding)))
}

/// Ensure exactly one pull secret holding `docker_config` exists for the binding.
/// An existing secret is updated in place, never deleted and recreated.
#[instrument(skip(api, binding, docker_config), fields(binding = %binding.name_any()))]
pub async fn sync_pull_secret(
    api: &Api<Secret>,
    binding: &WIPullBinding,
    docker_config: &str,
) -> Result<SecretSync> {
    match lookup_pull_secret(api, binding).await? {
        None => {
            let secret = new_pull_secret(binding, docker_config)?;
            info!("Creating pull secret {}", binding.pull_secret_name());
            api.create(&PostParams::default(), &secret).await?;
            Ok(SecretSync::Created)
        }
        Some(mut secret) => {
            if !update_pull_secret(&mut secret, binding, docker_config) {
                debug!("Pull secret {} is up to date", secret.name_any());
                return Ok(SecretSync::Unchanged);
            }
            info!("Updating pull secret {}", secret.name_any());
            api.replace(&secret.name_any(), &PostParams::default(), &secret)
                .await?;
            Ok(SecretSync::Updated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        binding_json, conflict_json, pull_secret_json, secret_list_json, secrets_path, MockService,
    };

    fn binding() -> WIPullBinding {
        serde_json::from_str(&binding_json("apps", "x", &[], false)).unwrap()
    }

    fn secret(binding_name: &str, docker_config: &str) -> Secret {
        serde_json::from_value(pull_secret_json("apps", binding_name, docker_config)).unwrap()
    }

    #[test]
    fn test_new_pull_secret_layout() {
        let secret = new_pull_secret(&binding(), "{}").unwrap();

        assert_eq!(secret.name_any(), "x-msi-acrpull-secret");
        assert_eq!(secret.namespace().as_deref(), Some("apps"));
        assert_eq!(secret.type_.as_deref(), Some("kubernetes.io/dockerconfigjson"));
        assert_eq!(
            secret.data.unwrap()[".dockerconfigjson"],
            ByteString(b"{}".to_vec())
        );
        assert_eq!(secret.metadata.labels.unwrap()[labels::BINDING], "x");

        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "WIPullBinding");
        assert_eq!(owners[0].name, "x");
        assert_eq!(owners[0].uid, "binding-uid");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn test_new_pull_secret_requires_uid() {
        let mut binding = binding();
        binding.metadata.uid = None;

        let err = new_pull_secret(&binding, "{}").unwrap_err();
        assert!(matches!(err, AcrPullError::OwnerReference(_)));
    }

    #[test]
    fn test_find_pull_secret_matches_name_and_owner() {
        let binding = binding();
        let mut foreign = secret("x", "{}");
        foreign.metadata.owner_references.as_mut().unwrap()[0].uid = "someone-else".to_string();

        assert!(find_pull_secret(vec![foreign], &binding).is_none());
        assert!(find_pull_secret(vec![secret("y", "{}")], &binding).is_none());
        assert!(find_pull_secret(vec![secret("y", "{}"), secret("x", "{}")], &binding).is_some());
    }

    #[test]
    fn test_update_pull_secret_detects_change() {
        let binding = binding();
        let mut existing = secret("x", "old");

        assert!(!update_pull_secret(&mut existing, &binding, "old"));
        assert!(update_pull_secret(&mut existing, &binding, "new"));
        assert_eq!(
            existing.data.unwrap()[".dockerconfigjson"],
            ByteString(b"new".to_vec())
        );
    }

    #[test]
    fn test_update_pull_secret_restores_labels() {
        let binding = binding();
        let mut existing = secret("x", "cfg");
        existing.metadata.labels = None;

        assert!(update_pull_secret(&mut existing, &binding, "cfg"));
        let restored = existing.metadata.labels.as_ref().unwrap();
        assert_eq!(restored[labels::BINDING], "x");
        assert_eq!(restored[labels::MANAGED_BY], "wi-acrpull");
        assert!(!update_pull_secret(&mut existing, &binding, "cfg"));
    }

    #[tokio::test]
    async fn test_sync_finds_unlabelled_secret_by_name() {
        let path = secrets_path("apps");
        let secret_path = format!("{}/x-msi-acrpull-secret", path);
        let mut unlabelled = pull_secret_json("apps", "x", "cfg");
        unlabelled["metadata"]
            .as_object_mut()
            .unwrap()
            .remove("labels");
        let mock = MockService::new()
            .on_get(&path, 200, &secret_list_json(vec![]))
            .on_get(&secret_path, 200, &unlabelled.to_string())
            .on_post(&path, 409, &conflict_json("secrets", "x-msi-acrpull-secret"))
            .on_put(&secret_path, 200, &pull_secret_json("apps", "x", "cfg").to_string());
        let api: Api<Secret> = Api::namespaced(mock.client(), "apps");

        let result = sync_pull_secret(&api, &binding(), "cfg").await.unwrap();

        assert_eq!(result, SecretSync::Updated);
        let mutations = mock.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, "PUT");
        assert_eq!(
            mutations[0].json()["metadata"]["labels"][labels::BINDING],
            "x"
        );
    }

    #[tokio::test]
    async fn test_sync_ignores_same_name_secret_of_another_owner() {
        let path = secrets_path("apps");
        let secret_path = format!("{}/x-msi-acrpull-secret", path);
        let mut foreign = pull_secret_json("apps", "x", "cfg");
        foreign["metadata"]["ownerReferences"][0]["uid"] = serde_json::json!("someone-else");
        let mock = MockService::new()
            .on_get(&path, 200, &secret_list_json(vec![]))
            .on_get(&secret_path, 200, &foreign.to_string())
            .on_post(&path, 409, &conflict_json("secrets", "x-msi-acrpull-secret"));
        let api: Api<Secret> = Api::namespaced(mock.client(), "apps");

        let err = sync_pull_secret(&api, &binding(), "cfg").await.unwrap_err();

        assert!(matches!(err, AcrPullError::KubeError(kube::Error::Api(ref e)) if e.code == 409));
        assert!(mock.mutations().iter().all(|m| m.method != "PUT"));
    }

    #[tokio::test]
    async fn test_sync_creates_missing_secret() {
        let path = secrets_path("apps");
        let mock = MockService::new()
            .on_get(&path, 200, &secret_list_json(vec![]))
            .on_post(&path, 201, &pull_secret_json("apps", "x", "cfg").to_string());
        let api: Api<Secret> = Api::namespaced(mock.client(), "apps");

        let result = sync_pull_secret(&api, &binding(), "cfg").await.unwrap();

        assert_eq!(result, SecretSync::Created);
        let mutations = mock.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, "POST");
        assert_eq!(mutations[0].json()["metadata"]["name"], "x-msi-acrpull-secret");
    }

    #[tokio::test]
    async fn test_sync_replaces_stale_secret_in_place() {
        let path = secrets_path("apps");
        let mock = MockService::new()
            .on_get(&path, 200, &secret_list_json(vec![pull_secret_json("apps", "x", "old")]))
            .on_put(
                &format!("{}/x-msi-acrpull-secret", path),
                200,
                &pull_secret_json("apps", "x", "new").to_string(),
            );
        let api: Api<Secret> = Api::namespaced(mock.client(), "apps");

        let result = sync_pull_secret(&api, &binding(), "new").await.unwrap();

        assert_eq!(result, SecretSync::Updated);
        let mutations = mock.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, "PUT");
        assert_eq!(mutations[0].json()["metadata"]["resourceVersion"], "3");
    }

    #[tokio::test]
    async fn test_sync_leaves_current_secret_alone() {
        let path = secrets_path("apps");
        let mock = MockService::new()
            .on_get(&path, 200, &secret_list_json(vec![pull_secret_json("apps", "x", "cfg")]));
        let api: Api<Secret> = Api::namespaced(mock.client(), "apps");

        let result = sync_pull_secret(&api, &binding(), "cfg").await.unwrap();

        assert_eq!(result, SecretSync::Unchanged);
        assert!(mock.mutations().is_empty());
    }
}
