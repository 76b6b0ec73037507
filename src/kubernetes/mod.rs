// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes side effects of a binding: pull secret, service account
//! reference, finalizer and status.

pub mod crd;
pub mod finalizer;
pub mod pull_secret;
pub mod service_account;
pub mod status;

pub use crd::wait_for_binding_crd;
pub use finalizer::{ensure_registered, teardown, FinalizerState};
pub use pull_secret::{sync_pull_secret, SecretSync};
pub use service_account::{ensure_pull_secret_ref, remove_pull_secret_ref};
pub use status::{set_error_status, set_success_status};
