// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types owned by wi-acrpull.

pub mod binding;

pub use binding::{WIPullBinding, WIPullBindingSpec, WIPullBindingStatus};
