// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use base64::{engine::general_purpose::STANDARD, Engine};
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request received by the mock API server
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// A mock HTTP service that returns predefined responses based on request paths
/// and records every request it receives.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Build a kube Client sharing this mock's state
    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Every request that is not a read
    pub fn mutations(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .collect()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();
        responses
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let bytes = req.into_body().collect().await?.to_bytes();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path: path.clone(),
                body: String::from_utf8_lossy(&bytes).to_string(),
            });

            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("object", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

pub fn binding_path(namespace: &str, name: &str) -> String {
    format!(
        "/apis/wi-acrpull.microsoft.com/v1/namespaces/{}/wipullbindings/{}",
        namespace, name
    )
}

pub fn binding_status_path(namespace: &str, name: &str) -> String {
    format!("{}/status", binding_path(namespace, name))
}

pub fn secrets_path(namespace: &str) -> String {
    format!("/api/v1/namespaces/{}/secrets", namespace)
}

pub fn service_account_path(namespace: &str, name: &str) -> String {
    format!("/api/v1/namespaces/{}/serviceaccounts/{}", namespace, name)
}

/// Create a mock WIPullBinding JSON response
pub fn binding_json(
    namespace: &str,
    name: &str,
    finalizers: &[&str],
    deleting: bool,
) -> String {
    let mut metadata = serde_json::json!({
        "name": name,
        "namespace": namespace,
        "uid": "binding-uid",
        "resourceVersion": "7",
        "generation": 1,
        "finalizers": finalizers,
    });
    if deleting {
        metadata["deletionTimestamp"] = serde_json::json!("2026-01-01T00:00:00Z");
    }

    serde_json::json!({
        "apiVersion": "wi-acrpull.microsoft.com/v1",
        "kind": "WIPullBinding",
        "metadata": metadata,
        "spec": {
            "acrServer": "x.azurecr.io",
            "servicePrincipalClientID": "abc",
            "servicePrincipalTenantID": "def"
        }
    })
    .to_string()
}

/// Create a mock pull secret owned by the given binding
pub fn pull_secret_json(namespace: &str, binding: &str, docker_config: &str) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": format!("{}-msi-acrpull-secret", binding),
            "namespace": namespace,
            "resourceVersion": "3",
            "labels": {
                "wi-acrpull.microsoft.com/binding": binding,
                "app.kubernetes.io/managed-by": "wi-acrpull"
            },
            "ownerReferences": [{
                "apiVersion": "wi-acrpull.microsoft.com/v1",
                "kind": "WIPullBinding",
                "name": binding,
                "uid": "binding-uid",
                "controller": true,
                "blockOwnerDeletion": true
            }]
        },
        "type": "kubernetes.io/dockerconfigjson",
        "data": { ".dockerconfigjson": STANDARD.encode(docker_config) }
    })
}

pub fn secret_list_json(items: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "SecretList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create a mock ServiceAccount with the given image pull secret references
pub fn service_account_json(namespace: &str, name: &str, pull_secrets: &[&str]) -> String {
    let refs: Vec<serde_json::Value> = pull_secrets
        .iter()
        .map(|s| serde_json::json!({ "name": s }))
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ServiceAccount",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": "11"
        },
        "imagePullSecrets": refs
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

pub fn conflict_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("Operation cannot be fulfilled on {} \"{}\": the object has been modified", resource, name),
        "reason": "Conflict",
        "code": 409
    })
    .to_string()
}
