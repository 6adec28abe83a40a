// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Utility modules
//!
//! Terminal helpers shared by the pipewright commands.

pub mod colors;

pub use colors::*;
