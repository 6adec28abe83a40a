// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline topology builder
//!
//! Defines the stages, actions and artifacts of a pipeline, the build project
//! they share, and the assembly step that checks every cross-stage invariant
//! before handing back an immutable [`Pipeline`].

mod builder;
mod dag;
mod definition;
mod project;
mod validation;

pub use builder::*;
pub use dag::{Flow, TopologyGraph};
pub use definition::*;
pub use project::*;
pub use validation::{assemble_pipeline, assemble_pipeline_with, TopologyValidator};
