// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! # pipewright - CI pipeline topology builder
//!
//! `pipewright` declares a two-stage CI pipeline (retrieve a branch from a
//! hosted Git repository, then build it on a shared build project), checks
//! that every artifact and variable flows strictly forward, and synthesizes a
//! stack descriptor for an external provisioning platform.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a starter configuration
//! pipewright init --owner acme --repo widgets --branch main
//!
//! # Check it
//! pipewright validate
//!
//! # Write the descriptor
//! pipewright synth --output stack.json
//! ```
//!
//! The builder can also be driven directly:
//!
//! ```
//! use pipewright::topology::*;
//!
//! let source = SourceConfig::new("acme", "widgets", "main", SecretRef::new("github/access", "DemoToken"));
//! let (retrieve, sources) = define_source_stage(&source).unwrap();
//! let project = define_build_project(ComputeConfig::new("widgets-build")).unwrap();
//! let namespace = retrieve.variables().unwrap();
//! let (build, _) = define_build_stage(&sources, &project, &namespace).unwrap();
//!
//! let pipeline = assemble_pipeline("demo", "bucket-x", vec![retrieve, build]).unwrap();
//! assert_eq!(pipeline.artifact_names(), vec!["GithubSource", "CIArtifact"]);
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod synth;
pub mod topology;
pub mod utils;

// Re-export commonly used types
pub use config::StackConfig;
pub use errors::{PipewrightError, PipewrightResult, TopologyViolation};
pub use synth::{PipelineStack, StackDescriptor};
pub use topology::{Artifact, BuildProject, Pipeline, Stage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
