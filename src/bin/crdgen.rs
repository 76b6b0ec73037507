// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResourceExt;
use wi_acrpull::types::WIPullBinding;

/// Print the WIPullBinding CRD as YAML
fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&WIPullBinding::crd())?);
    Ok(())
}
