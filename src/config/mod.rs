// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Stack configuration
//!
//! Loads `.pipewright.yaml` (or a `.toml` equivalent). Every recognized
//! option has a documented default except the repository coordinates, the
//! pipeline name, the artifact bucket and the build project name, which must
//! be supplied. Enumerated options are kept as strings here and parsed by
//! [`StackConfig::validate`] so a bad value is reported against its field.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{PipewrightError, PipewrightResult};
use crate::synth::RemovalPolicy;
use crate::topology::{
    default_forwarded_variables, BuildImage, CacheMode, ComputeConfig, ComputeType,
    ForwardedVariable, PipelineOptions, SecretRef, SourceConfig, TriggerMode,
};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".pipewright.yaml";

/// Stack configuration from .pipewright.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Configuration version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Stack metadata
    #[serde(default)]
    pub stack: StackSettings,

    /// Hosted Git repository to retrieve
    pub repository: RepositoryConfig,

    /// Pipeline settings
    pub pipeline: PipelineConfig,

    /// Shared build project
    pub build: BuildConfig,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_true() -> bool {
    true
}

/// Stack metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSettings {
    #[serde(default = "default_stack_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            name: default_stack_name(),
            description: None,
        }
    }
}

fn default_stack_name() -> String {
    "pipewright-codepipeline".to_string()
}

/// Repository coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub name: String,

    /// Branch to build; there is no default
    #[serde(default)]
    pub branch: String,

    /// webhook | polling | none
    #[serde(default = "default_trigger")]
    pub trigger: String,

    /// Secret holding the repository access token
    #[serde(default)]
    pub oauth_token: TokenConfig,
}

fn default_trigger() -> String {
    "webhook".to_string()
}

/// Secret reference for the repository token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_secret_id")]
    pub secret_id: String,

    #[serde(default = "default_json_field")]
    pub json_field: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret_id: default_secret_id(),
            json_field: default_json_field(),
        }
    }
}

fn default_secret_id() -> String {
    "github/access".to_string()
}

fn default_json_field() -> String {
    "DemoToken".to_string()
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub name: String,

    /// Restart an in-flight execution when the definition is updated
    #[serde(default)]
    pub restart_execution_on_update: bool,

    /// Bucket artifacts are stored in
    pub artifact_bucket: BucketConfig,
}

/// Artifact bucket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    #[serde(default)]
    pub name: String,

    /// Empty the bucket when the stack is removed
    #[serde(default = "default_true")]
    pub auto_delete_objects: bool,

    /// destroy | retain
    #[serde(default = "default_removal_policy")]
    pub removal_policy: String,
}

fn default_removal_policy() -> String {
    "destroy".to_string()
}

/// Build project settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub project_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_image")]
    pub image: String,

    /// small | medium | large
    #[serde(default = "default_compute_type")]
    pub compute_type: String,

    /// none | local-source | local-custom | local-docker-layer
    #[serde(default = "default_cache")]
    pub cache: Vec<String>,

    #[serde(default = "default_queued_timeout")]
    pub queued_timeout_minutes: i64,

    #[serde(default = "default_timeout")]
    pub timeout_minutes: i64,

    #[serde(default = "default_true")]
    pub check_secrets_in_plain_text_env_variables: bool,

    /// Build environment variable name -> source variable
    #[serde(default = "default_forward_variables")]
    pub forward_variables: BTreeMap<String, String>,
}

fn default_image() -> String {
    "standard-5.0".to_string()
}

fn default_compute_type() -> String {
    "small".to_string()
}

fn default_cache() -> Vec<String> {
    vec!["local-source".to_string(), "local-custom".to_string()]
}

fn default_queued_timeout() -> i64 {
    15
}

fn default_timeout() -> i64 {
    5
}

fn default_forward_variables() -> BTreeMap<String, String> {
    default_forwarded_variables()
        .into_iter()
        .map(|f| (f.env_name, f.variable))
        .collect()
}

fn parse_field<T>(field: &str, value: &str) -> PipewrightResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|reason: String| PipewrightError::invalid_value(field, reason))
}

fn positive_minutes(field: &str, minutes: i64) -> PipewrightResult<Duration> {
    if minutes <= 0 {
        return Err(PipewrightError::invalid_value(
            field,
            format!("timeout must be positive, got {} minute(s)", minutes),
        ));
    }
    u64::try_from(minutes)
        .ok()
        .and_then(|m| m.checked_mul(60))
        .map(Duration::from_secs)
        .ok_or_else(|| PipewrightError::invalid_value(field, "timeout is too large"))
}

fn require(field: &str, value: &str) -> PipewrightResult<()> {
    if value.trim().is_empty() {
        return Err(PipewrightError::missing_field(field));
    }
    Ok(())
}

impl StackConfig {
    /// Starter configuration for `pipewright init`
    pub fn starter(owner: &str, repo: &str, branch: &str) -> Self {
        Self {
            version: default_version(),
            stack: StackSettings::default(),
            repository: RepositoryConfig {
                owner: owner.to_string(),
                name: repo.to_string(),
                branch: branch.to_string(),
                trigger: default_trigger(),
                oauth_token: TokenConfig::default(),
            },
            pipeline: PipelineConfig {
                name: format!("{}-codepipeline", repo),
                restart_execution_on_update: false,
                artifact_bucket: BucketConfig {
                    name: format!("{}-codepipeline-bucket", repo),
                    auto_delete_objects: true,
                    removal_policy: default_removal_policy(),
                },
            },
            build: BuildConfig {
                project_name: format!("{}-codebuild-project", repo),
                description: Some(format!("CI for {}/{}", owner, repo)),
                image: default_image(),
                compute_type: default_compute_type(),
                cache: default_cache(),
                queued_timeout_minutes: default_queued_timeout(),
                timeout_minutes: default_timeout(),
                check_secrets_in_plain_text_env_variables: true,
                forward_variables: default_forward_variables(),
            },
        }
    }

    /// Load configuration from a YAML or TOML file (chosen by extension)
    pub fn from_file(path: &Path) -> PipewrightResult<Self> {
        if !path.exists() {
            return Err(PipewrightError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| PipewrightError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), "loading stack configuration");

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> PipewrightResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> PipewrightResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> PipewrightResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Replace repository coordinates with values given on the command line
    pub fn apply_overrides(
        &mut self,
        owner: Option<String>,
        repo: Option<String>,
        branch: Option<String>,
    ) {
        if let Some(owner) = owner {
            self.repository.owner = owner;
        }
        if let Some(repo) = repo {
            self.repository.name = repo;
        }
        if let Some(branch) = branch {
            self.repository.branch = branch;
        }
    }

    /// Check every option eagerly, stopping at the first bad field
    pub fn validate(&self) -> PipewrightResult<()> {
        require("stack.name", &self.stack.name)?;
        self.source_config()?;
        self.pipeline_options()?;
        self.removal_policy()?;
        self.compute_config()?;
        Ok(())
    }

    /// Source stage inputs
    pub fn source_config(&self) -> PipewrightResult<SourceConfig> {
        let repo = &self.repository;
        require("repository.owner", &repo.owner)?;
        require("repository.name", &repo.name)?;
        require("repository.branch", &repo.branch)?;
        require("repository.oauth_token.secret_id", &repo.oauth_token.secret_id)?;
        require("repository.oauth_token.json_field", &repo.oauth_token.json_field)?;

        let mut config = SourceConfig::new(
            repo.owner.trim(),
            repo.name.trim(),
            repo.branch.trim(),
            SecretRef::new(&repo.oauth_token.secret_id, &repo.oauth_token.json_field),
        );
        config.trigger = parse_field::<TriggerMode>("repository.trigger", &repo.trigger)?;
        Ok(config)
    }

    /// Pipeline assembly options
    pub fn pipeline_options(&self) -> PipewrightResult<PipelineOptions> {
        require("pipeline.name", &self.pipeline.name)?;
        require("pipeline.artifact_bucket.name", &self.pipeline.artifact_bucket.name)?;

        let mut options = PipelineOptions::new(
            self.pipeline.name.trim(),
            self.pipeline.artifact_bucket.name.trim(),
        );
        options.restart_execution_on_update = self.pipeline.restart_execution_on_update;
        Ok(options)
    }

    /// Removal policy of the artifact bucket
    pub fn removal_policy(&self) -> PipewrightResult<RemovalPolicy> {
        parse_field(
            "pipeline.artifact_bucket.removal_policy",
            &self.pipeline.artifact_bucket.removal_policy,
        )
    }

    /// Build project inputs
    pub fn compute_config(&self) -> PipewrightResult<ComputeConfig> {
        let build = &self.build;
        require("build.project_name", &build.project_name)?;

        let cache = build
            .cache
            .iter()
            .map(|mode| parse_field::<CacheMode>("build.cache", mode))
            .collect::<PipewrightResult<Vec<_>>>()?;

        Ok(ComputeConfig {
            project_name: build.project_name.trim().to_string(),
            description: build.description.clone(),
            image: parse_field::<BuildImage>("build.image", &build.image)?,
            compute_type: parse_field::<ComputeType>("build.compute_type", &build.compute_type)?,
            cache,
            queued_timeout: positive_minutes(
                "build.queued_timeout_minutes",
                build.queued_timeout_minutes,
            )?,
            timeout: positive_minutes("build.timeout_minutes", build.timeout_minutes)?,
            check_secrets_in_plain_text_env_variables: build
                .check_secrets_in_plain_text_env_variables,
        })
    }

    /// Upstream variables forwarded into the build environment
    pub fn forwarded_variables(&self) -> Vec<ForwardedVariable> {
        self.build
            .forward_variables
            .iter()
            .map(|(env_name, variable)| ForwardedVariable::new(env_name, variable))
            .collect()
    }
}
