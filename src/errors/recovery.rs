// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use super::{PipewrightError, TopologyViolation};

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest a fix for a single topology violation
    pub fn for_violation(violation: &TopologyViolation) -> Self {
        match violation {
            TopologyViolation::NoStages => Self {
                action: "Add stages to the pipeline".into(),
                steps: vec![
                    "A pipeline needs a source stage followed by at least one build stage".into(),
                ],
                commands: vec![],
            },
            TopologyViolation::EmptyStage { stage } => Self {
                action: format!("Give stage '{}' an action", stage),
                steps: vec![
                    "Every stage runs at least one action".into(),
                    format!("Add an action to '{}' or remove the stage", stage),
                ],
                commands: vec![],
            },
            TopologyViolation::DuplicateStage { stage } => Self {
                action: format!("Rename one of the '{}' stages", stage),
                steps: vec!["Stage names must be unique within a pipeline".into()],
                commands: vec![],
            },
            TopologyViolation::DuplicateAction { stage, action } => Self {
                action: format!("Rename one of the '{}' actions", action),
                steps: vec![format!(
                    "Action names must be unique within stage '{}'",
                    stage
                )],
                commands: vec![],
            },
            TopologyViolation::InvalidRunOrder { action, .. } => Self {
                action: format!("Fix the run order of '{}'", action),
                steps: vec!["Run orders start at 1 and may not exceed 999".into()],
                commands: vec![],
            },
            TopologyViolation::DuplicateArtifact {
                artifact,
                second_stage,
                ..
            } => Self {
                action: format!("Rename the '{}' artifact", artifact),
                steps: vec![
                    "Artifact names are unique across the whole pipeline".into(),
                    format!("Give the output of stage '{}' a different name", second_stage),
                ],
                commands: vec![],
            },
            TopologyViolation::ArtifactConsumedBeforeProduced {
                artifact,
                stage,
                producer,
                ..
            } => Self {
                action: "Reorder stages".into(),
                steps: vec![
                    format!("'{}' is produced by stage '{}'", artifact, producer),
                    format!("Stage '{}' must come after '{}'", stage, producer),
                    "An artifact is only visible to strictly later stages".into(),
                ],
                commands: vec![
                    "# Inspect the current stage order:".into(),
                    "pipewright graph --format text".into(),
                ],
            },
            TopologyViolation::ArtifactNeverProduced { artifact, .. } => Self {
                action: format!("Produce '{}' in an earlier stage", artifact),
                steps: vec![
                    "Every consumed artifact needs a producing action".into(),
                    "Check the artifact name for typos".into(),
                ],
                commands: vec![],
            },
            TopologyViolation::DuplicateNamespace { namespace, .. } => Self {
                action: format!("Rename the '{}' namespace", namespace),
                steps: vec!["Variables namespaces are unique across the pipeline".into()],
                commands: vec![],
            },
            TopologyViolation::NamespaceReferencedBeforePublished {
                namespace,
                stage,
                publisher,
                ..
            } => Self {
                action: "Reorder stages".into(),
                steps: vec![
                    format!("Namespace '{}' is published by stage '{}'", namespace, publisher),
                    format!("Stage '{}' must come after '{}'", stage, publisher),
                ],
                commands: vec!["pipewright graph --format text".into()],
            },
            TopologyViolation::NamespaceNeverPublished { namespace, .. } => Self {
                action: format!("Publish namespace '{}' upstream", namespace),
                steps: vec![
                    "Set the variables namespace on the upstream action".into(),
                    "Check the namespace name for typos".into(),
                ],
                commands: vec![],
            },
            TopologyViolation::UnknownVariable {
                namespace,
                variable,
                ..
            } => Self {
                action: format!("Stop referencing '{}.{}'", namespace, variable),
                steps: vec![
                    "Source actions publish CommitId, CommitterDate, AuthorDate, BranchName,".into(),
                    "CommitMessage, CommitUrl and RepositoryName".into(),
                ],
                commands: vec![],
            },
            TopologyViolation::MultipleBuildProjects { expected, .. } => Self {
                action: format!("Point every build action at '{}'", expected),
                steps: vec!["Build actions share one build project".into()],
                commands: vec![],
            },
        }
    }

    /// Suggest a fix for any pipewright error
    pub fn for_error(error: &PipewrightError) -> Vec<Self> {
        match error {
            PipewrightError::Topology { violations } => {
                violations.iter().map(Self::for_violation).collect()
            }
            PipewrightError::Configuration { field, .. } => vec![Self {
                action: format!("Fix '{}'", field),
                steps: vec![format!(
                    "Edit '{}' in your configuration file and run validate again",
                    field
                )],
                commands: vec!["pipewright validate".into()],
            }],
            PipewrightError::ConfigNotFound { .. } => vec![Self {
                action: "Create a configuration file".into(),
                steps: vec!["Generate a starter .pipewright.yaml".into()],
                commands: vec!["pipewright init --owner <owner> --repo <repo> --branch <branch>".into()],
            }],
            _ => vec![],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  • {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
