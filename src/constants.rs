// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// API group of the WIPullBinding resource
pub const API_GROUP: &str = "wi-acrpull.microsoft.com";

/// The operator name used as field manager for writes
pub const OPERATOR_NAME: &str = "wi-acrpull";

/// Finalizer recorded on every binding before any side effect is created.
/// Compared by exact match, so this value must never change.
pub const FINALIZER_NAME: &str = "wi-acrpull.microsoft.com";

/// Service account used when a binding does not name one
pub const DEFAULT_SERVICE_ACCOUNT_NAME: &str = "default";

/// Kubernetes label keys used by wi-acrpull
pub mod labels {
    /// Name of the binding that owns a pull secret
    pub const BINDING: &str = "wi-acrpull.microsoft.com/binding";
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}

/// Pull secret layout
pub mod pull_secret {
    /// Suffix appended to the binding name to form the secret name
    pub const NAME_SUFFIX: &str = "-msi-acrpull-secret";
    /// Key holding the docker config document
    pub const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";
    pub const SECRET_TYPE: &str = "kubernetes.io/dockerconfigjson";
}

/// Token acquisition defaults
pub mod token {
    /// Projected service account token used as the client assertion
    pub const DEFAULT_TOKEN_FILE_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
    pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";
    pub const DEFAULT_SCOPE: &str = "https://containerregistry.azure.net/.default";
    /// Refresh this long before the registry token expires
    pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 30 * 60;
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
}

/// Backoff applied by the error policy
pub mod backoff {
    pub const BASE_SECS: u64 = 5;
    pub const MAX_SECS: u64 = 300;
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
