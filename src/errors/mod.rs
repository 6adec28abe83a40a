// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Error types with actionable diagnostics
//!
//! Two kinds of failure come out of the topology builder: a configuration
//! error raised by the call that received the bad input, and a topology error
//! raised by assembly that lists every violated invariant at once. The
//! remaining variants cover loading configuration and writing descriptors.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipewright operations
pub type PipewrightResult<T> = Result<T, PipewrightError>;

/// Main error type for pipewright
#[derive(Error, Debug, Diagnostic)]
pub enum PipewrightError {
    // ─────────────────────────────────────────────────────────────────────────
    // Builder Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration for '{field}': {reason}")]
    #[diagnostic(code(pipewright::configuration))]
    Configuration {
        field: String,
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Pipeline topology is invalid ({} violation(s))", violations.len())]
    #[diagnostic(
        code(pipewright::topology),
        help("Every violation is listed below; fix them all before synthesizing again")
    )]
    Topology {
        #[related]
        violations: Vec<TopologyViolation>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(pipewright::config_not_found),
        help("Create one with 'pipewright init' or write .pipewright.yaml manually")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(pipewright::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(pipewright::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Parse Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(pipewright::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(pipewright::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(pipewright::toml_error))]
    Toml { message: String },
}

/// A single broken cross-entity invariant found while assembling a pipeline
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum TopologyViolation {
    #[error("Pipeline has no stages")]
    #[diagnostic(code(pipewright::topology::no_stages))]
    NoStages,

    #[error("Stage '{stage}' has no actions")]
    #[diagnostic(code(pipewright::topology::empty_stage))]
    EmptyStage { stage: String },

    #[error("Duplicate stage name '{stage}'")]
    #[diagnostic(code(pipewright::topology::duplicate_stage))]
    DuplicateStage { stage: String },

    #[error("Stage '{stage}' declares action '{action}' more than once")]
    #[diagnostic(code(pipewright::topology::duplicate_action))]
    DuplicateAction { stage: String, action: String },

    #[error("Action '{stage}/{action}' has run order {run_order}, expected 1 to 999")]
    #[diagnostic(code(pipewright::topology::run_order))]
    InvalidRunOrder {
        stage: String,
        action: String,
        run_order: u32,
    },

    #[error("Artifact '{artifact}' is produced by stage '{first_stage}' and again by stage '{second_stage}'")]
    #[diagnostic(code(pipewright::topology::duplicate_artifact))]
    DuplicateArtifact {
        artifact: String,
        first_stage: String,
        second_stage: String,
    },

    #[error("Artifact '{artifact}' is consumed by '{stage}/{action}' before it is produced (by stage '{producer}')")]
    #[diagnostic(
        code(pipewright::topology::artifact_order),
        help("Move stage '{producer}' ahead of stage '{stage}'")
    )]
    ArtifactConsumedBeforeProduced {
        artifact: String,
        stage: String,
        action: String,
        producer: String,
    },

    #[error("Artifact '{artifact}' is consumed by '{stage}/{action}' but no action produces it")]
    #[diagnostic(code(pipewright::topology::artifact_unproduced))]
    ArtifactNeverProduced {
        artifact: String,
        stage: String,
        action: String,
    },

    #[error("Variables namespace '{namespace}' is published by stage '{first_stage}' and again by stage '{second_stage}'")]
    #[diagnostic(code(pipewright::topology::duplicate_namespace))]
    DuplicateNamespace {
        namespace: String,
        first_stage: String,
        second_stage: String,
    },

    #[error("Variables namespace '{namespace}' is referenced by '{stage}/{action}' before it is published (by stage '{publisher}')")]
    #[diagnostic(
        code(pipewright::topology::namespace_order),
        help("Move stage '{publisher}' ahead of stage '{stage}'")
    )]
    NamespaceReferencedBeforePublished {
        namespace: String,
        stage: String,
        action: String,
        publisher: String,
    },

    #[error("Variables namespace '{namespace}' is referenced by '{stage}/{action}' but no action publishes it")]
    #[diagnostic(code(pipewright::topology::namespace_unpublished))]
    NamespaceNeverPublished {
        namespace: String,
        stage: String,
        action: String,
    },

    #[error("Variable '{namespace}.{variable}' referenced by '{stage}/{action}' is not published by that namespace")]
    #[diagnostic(code(pipewright::topology::unknown_variable))]
    UnknownVariable {
        namespace: String,
        variable: String,
        stage: String,
        action: String,
    },

    #[error("Build action '{stage}/{action}' uses project '{project}' but the pipeline already uses '{expected}'")]
    #[diagnostic(
        code(pipewright::topology::multiple_projects),
        help("All build actions share a single build project")
    )]
    MultipleBuildProjects {
        stage: String,
        action: String,
        project: String,
        expected: String,
    },
}

impl From<serde_yaml::Error> for PipewrightError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PipewrightError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PipewrightError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl PipewrightError {
    /// Create a configuration error for a field that is missing or blank
    pub fn missing_field(field: &str) -> Self {
        Self::Configuration {
            field: field.to_string(),
            reason: "value is required and must not be empty".to_string(),
            help: Some(format!("Set '{}' in your .pipewright.yaml", field)),
        }
    }

    /// Create a configuration error for a value outside the recognized set
    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.to_string(),
            reason: reason.into(),
            help: None,
        }
    }

    /// Violations carried by a topology error (empty for every other kind)
    pub fn violations(&self) -> &[TopologyViolation] {
        match self {
            Self::Topology { violations } => violations,
            _ => &[],
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_topology(&self) -> bool {
        matches!(self, Self::Topology { .. })
    }
}
