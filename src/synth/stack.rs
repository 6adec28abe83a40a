// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Stack composition
//!
//! Turns a [`StackConfig`] into the shared build project, the artifact
//! bucket, the two stages and the assembled pipeline, in that order.

use serde::{Deserialize, Serialize};

use crate::config::StackConfig;
use crate::errors::{PipewrightError, PipewrightResult};
use crate::topology::{
    assemble_pipeline_with, define_build_project, define_build_stage_with, define_source_stage,
    BuildProject, Pipeline,
};

/// What happens to the artifact bucket when the stack is removed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    #[default]
    Destroy,
    Retain,
}

impl std::fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Destroy => write!(f, "destroy"),
            Self::Retain => write!(f, "retain"),
        }
    }
}

impl std::str::FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "destroy" => Ok(Self::Destroy),
            "retain" => Ok(Self::Retain),
            _ => Err(format!(
                "Unknown removal policy: {} (expected destroy or retain)",
                s
            )),
        }
    }
}

/// Bucket the pipeline stores its artifacts in
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StorageLocation {
    pub name: String,
    pub auto_delete_objects: bool,
    pub removal_policy: RemovalPolicy,
}

impl StorageLocation {
    pub fn arn(&self) -> String {
        format!("arn:aws:s3:::{}", self.name)
    }
}

/// A named value exported by the stack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackOutput {
    pub name: String,
    pub value: String,
}

impl StackOutput {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Everything a stack declares
#[derive(Debug, Clone)]
pub struct PipelineStack {
    pub name: String,
    pub description: Option<String>,
    pub bucket: StorageLocation,
    pub project: BuildProject,
    /// Nested stack the build project is declared in
    pub build_stack: String,
    pub pipeline: Pipeline,
    pub outputs: Vec<StackOutput>,
}

impl PipelineStack {
    /// Compose the stack described by `config`
    pub fn synthesize(config: &StackConfig) -> PipewrightResult<Self> {
        config.validate()?;

        let project = define_build_project(config.compute_config()?)?;

        let bucket = StorageLocation {
            name: config.pipeline.artifact_bucket.name.trim().to_string(),
            auto_delete_objects: config.pipeline.artifact_bucket.auto_delete_objects,
            removal_policy: config.removal_policy()?,
        };

        let (source, source_artifact) = define_source_stage(&config.source_config()?)?;
        let namespace = source
            .variables()
            .ok_or_else(|| PipewrightError::missing_field("repository"))?;
        let (build, _) = define_build_stage_with(
            &source_artifact,
            &project,
            &namespace,
            &config.forwarded_variables(),
        )?;

        let pipeline = assemble_pipeline_with(config.pipeline_options()?, vec![source, build])?;

        let outputs = vec![
            StackOutput::new("OutputS3BucketName", &bucket.name),
            StackOutput::new("OutputS3BucketArn", bucket.arn()),
            StackOutput::new("OutputPipelineName", pipeline.name()),
            StackOutput::new("OutputCodeBuildProjectName", project.name()),
        ];

        tracing::info!(
            stack = %config.stack.name,
            pipeline = pipeline.name(),
            stages = pipeline.stages().len(),
            "synthesized stack"
        );

        Ok(Self {
            name: config.stack.name.clone(),
            description: config.stack.description.clone(),
            bucket,
            project,
            build_stack: format!("{}-codebuild", config.stack.name),
            pipeline,
            outputs,
        })
    }

    /// Look up an output value by name
    pub fn output(&self, name: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{ActionKind, BUILD_ARTIFACT_NAME, SOURCE_ARTIFACT_NAME};

    fn config() -> StackConfig {
        StackConfig::starter("acme", "widgets", "main")
    }

    #[test]
    fn test_synthesize_two_stage_pipeline() {
        let stack = PipelineStack::synthesize(&config()).unwrap();

        assert_eq!(
            stack.pipeline.stage_names(),
            vec!["RetrieveStage", "ValidateAndBuildSources"]
        );
        assert_eq!(
            stack.pipeline.artifact_names(),
            vec![SOURCE_ARTIFACT_NAME, BUILD_ARTIFACT_NAME]
        );
        assert_eq!(stack.pipeline.build_project(), Some(stack.project.name()));
        assert_eq!(stack.pipeline.artifact_store(), stack.bucket.name);
        assert_eq!(stack.build_stack, "pipewright-codepipeline-codebuild");
    }

    #[test]
    fn test_outputs_name_every_resource() {
        let stack = PipelineStack::synthesize(&config()).unwrap();

        assert_eq!(stack.outputs.len(), 4);
        assert_eq!(
            stack.output("OutputS3BucketName"),
            Some("widgets-codepipeline-bucket")
        );
        assert_eq!(
            stack.output("OutputS3BucketArn"),
            Some("arn:aws:s3:::widgets-codepipeline-bucket")
        );
        assert_eq!(stack.output("OutputPipelineName"), Some("widgets-codepipeline"));
        assert_eq!(
            stack.output("OutputCodeBuildProjectName"),
            Some("widgets-codebuild-project")
        );
        assert_eq!(stack.output("OutputMissing"), None);
    }

    #[test]
    fn test_forward_variables_from_config() {
        let mut config = config();
        config
            .build
            .forward_variables
            .insert("BRANCH".into(), "BranchName".into());

        let stack = PipelineStack::synthesize(&config).unwrap();
        let build = stack.pipeline.stage("ValidateAndBuildSources").unwrap();
        match &build.actions[0].kind {
            ActionKind::CodeBuild { environment, .. } => {
                assert_eq!(environment.len(), 3);
                assert_eq!(
                    environment["BRANCH"].to_string(),
                    "#{SourceVariables.BranchName}"
                );
            }
            other => panic!("Expected CodeBuild action, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_forwarded_variable_is_configuration_error() {
        let mut config = config();
        config
            .build
            .forward_variables
            .insert("BUILD".into(), "BuildNumber".into());

        let err = PipelineStack::synthesize(&config).unwrap_err();
        match err {
            PipewrightError::Configuration { field, .. } => {
                assert_eq!(field, "build.forward_variables")
            }
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_bucket_name_rejected() {
        let mut config = config();
        config.pipeline.artifact_bucket.name = String::new();

        let err = PipelineStack::synthesize(&config).unwrap_err();
        assert!(err.to_string().contains("pipeline.artifact_bucket.name"));
    }

    #[test]
    fn test_removal_policy_parsing() {
        assert_eq!("RETAIN".parse::<RemovalPolicy>().unwrap(), RemovalPolicy::Retain);
        assert!("snapshot".parse::<RemovalPolicy>().is_err());
    }
}
