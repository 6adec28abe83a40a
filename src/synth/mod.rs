// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Stack synthesis
//!
//! Composes a validated pipeline stack from configuration and renders it as a
//! fingerprinted descriptor document.

mod descriptor;
mod stack;

pub use descriptor::{StackDescriptor, DESCRIPTOR_VERSION};
pub use stack::{PipelineStack, RemovalPolicy, StackOutput, StorageLocation};
