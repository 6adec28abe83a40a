// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline topology structures
//!
//! Artifacts, actions, stages and the assembled pipeline. A [`Pipeline`] can
//! only be obtained from assembly, so holding one means the topology passed
//! validation.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Variables published by every Git source action
pub const SOURCE_VARIABLES: &[&str] = &[
    "CommitId",
    "CommitterDate",
    "AuthorDate",
    "BranchName",
    "CommitMessage",
    "CommitUrl",
    "RepositoryName",
];

/// Lowest and highest run order accepted for an action
pub const RUN_ORDER_RANGE: std::ops::RangeInclusive<u32> = 1..=999;

/// A named bundle of files passed between stages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    name: String,

    /// Stage whose action produced this artifact, if known
    #[serde(skip)]
    produced_by: Option<String>,
}

impl Artifact {
    /// Reference an artifact by name without any known producer
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            produced_by: None,
        }
    }

    pub(crate) fn produced_in(name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            produced_by: Some(stage.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the stage that produced this artifact
    pub fn producer(&self) -> Option<&str> {
        self.produced_by.as_deref()
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Reference to a named field inside a secret, resolved by the provider at
/// deployment time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretRef {
    pub secret_id: String,
    pub json_field: String,
}

impl SecretRef {
    pub fn new(secret_id: impl Into<String>, json_field: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            json_field: json_field.into(),
        }
    }

    /// Dynamic reference string understood by the deployment platform
    pub fn dynamic_reference(&self) -> String {
        format!(
            "{{{{resolve:secretsmanager:{}:SecretString:{}}}}}",
            self.secret_id, self.json_field
        )
    }
}

/// How the source action learns about new commits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Repository webhook (default)
    #[default]
    Webhook,
    /// Periodic polling
    #[serde(alias = "poll")]
    Polling,
    /// Only run on manual release
    None,
}

impl TriggerMode {
    /// Value the pipeline service expects for this trigger
    pub fn provider_value(&self) -> &'static str {
        match self {
            Self::Webhook => "WebHook",
            Self::Polling => "Poll",
            Self::None => "None",
        }
    }
}

impl std::fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Webhook => write!(f, "webhook"),
            Self::Polling => write!(f, "polling"),
            Self::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "webhook" => Ok(Self::Webhook),
            "polling" | "poll" => Ok(Self::Polling),
            "none" => Ok(Self::None),
            _ => Err(format!("Unknown trigger mode: {} (expected webhook, polling or none)", s)),
        }
    }
}

/// `namespace.variable` reference to a value published by an earlier action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariableRef {
    pub namespace: String,
    pub variable: String,
}

impl VariableRef {
    pub fn new(namespace: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            variable: variable.into(),
        }
    }
}

impl std::fmt::Display for VariableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{{{}.{}}}", self.namespace, self.variable)
    }
}

/// Handle to a variables namespace published by an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablesNamespace {
    name: String,
    /// `None` when the action may publish any variable
    variables: Option<Vec<String>>,
}

impl VariablesNamespace {
    /// Namespace with a fixed set of variables
    pub fn closed(name: impl Into<String>, variables: &[&str]) -> Self {
        Self {
            name: name.into(),
            variables: Some(variables.iter().map(|v| v.to_string()).collect()),
        }
    }

    /// Namespace whose variables are not known ahead of time
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `variable` can be read from this namespace
    pub fn publishes(&self, variable: &str) -> bool {
        match &self.variables {
            Some(known) => known.iter().any(|v| v == variable),
            None => true,
        }
    }

    /// Reference a variable of this namespace
    pub fn variable(&self, variable: &str) -> VariableRef {
        VariableRef::new(&self.name, variable)
    }
}

/// Value of an environment variable handed to a build
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentValue {
    Plaintext(String),
    Variable(VariableRef),
}

impl EnvironmentValue {
    pub fn variable_ref(&self) -> Option<&VariableRef> {
        match self {
            Self::Variable(r) => Some(r),
            Self::Plaintext(_) => None,
        }
    }
}

impl std::fmt::Display for EnvironmentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plaintext(v) => write!(f, "{}", v),
            Self::Variable(r) => write!(f, "{}", r),
        }
    }
}

/// Provider-specific part of an action
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "provider")]
pub enum ActionKind {
    /// Retrieve a branch from a hosted GitHub repository
    #[serde(rename = "GitHub")]
    GitHubSource {
        owner: String,
        repo: String,
        branch: String,
        /// Rendered as a deploy-time dynamic reference, never as a value
        #[serde(serialize_with = "serialize_secret")]
        oauth_token: SecretRef,
        #[serde(serialize_with = "serialize_trigger")]
        trigger: TriggerMode,
    },

    /// Run a build on the shared build project
    #[serde(rename = "CodeBuild")]
    CodeBuild {
        project: String,
        environment: BTreeMap<String, EnvironmentValue>,
    },
}

impl ActionKind {
    /// Action category as the pipeline service names it
    pub fn category(&self) -> &'static str {
        match self {
            Self::GitHubSource { .. } => "Source",
            Self::CodeBuild { .. } => "Build",
        }
    }

    /// Variables this kind of action publishes, `None` for an open set
    pub fn published_variables(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::GitHubSource { .. } => Some(SOURCE_VARIABLES),
            Self::CodeBuild { .. } => None,
        }
    }

    /// Build project referenced by this action
    pub fn project(&self) -> Option<&str> {
        match self {
            Self::CodeBuild { project, .. } => Some(project),
            Self::GitHubSource { .. } => None,
        }
    }
}

fn serialize_secret<S: Serializer>(secret: &SecretRef, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&secret.dynamic_reference())
}

fn serialize_trigger<S: Serializer>(trigger: &TriggerMode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(trigger.provider_value())
}

/// A single unit of work within a stage
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Action {
    /// Action name (must be unique within its stage)
    pub name: String,

    /// Execution order inside the stage; equal values run concurrently
    pub run_order: u32,

    /// Provider configuration
    #[serde(flatten)]
    pub kind: ActionKind,

    /// Artifacts consumed
    pub inputs: Vec<Artifact>,

    /// Artifacts produced
    pub outputs: Vec<Artifact>,

    /// Namespace this action publishes its output variables under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables_namespace: Option<String>,
}

impl Action {
    /// Variable references read by this action
    pub fn referenced_variables(&self) -> Vec<&VariableRef> {
        match &self.kind {
            ActionKind::CodeBuild { environment, .. } => environment
                .values()
                .filter_map(EnvironmentValue::variable_ref)
                .collect(),
            ActionKind::GitHubSource { .. } => vec![],
        }
    }

    /// Handle to the namespace this action publishes, if any
    pub fn variables(&self) -> Option<VariablesNamespace> {
        let name = self.variables_namespace.as_ref()?;
        Some(match self.kind.published_variables() {
            Some(known) => VariablesNamespace::closed(name, known),
            None => VariablesNamespace::open(name),
        })
    }
}

/// An ordered unit of pipeline execution
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Stage {
    /// Stage name (must be unique within the pipeline)
    pub name: String,

    /// Actions in declaration order
    pub actions: Vec<Action>,
}

impl Stage {
    /// Get an action by name
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Artifacts produced by any action of this stage
    pub fn produced_artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.actions.iter().flat_map(|a| a.outputs.iter())
    }

    /// Artifacts consumed by any action of this stage
    pub fn consumed_artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.actions.iter().flat_map(|a| a.inputs.iter())
    }

    /// Namespace of the first action in this stage that publishes one
    pub fn variables(&self) -> Option<VariablesNamespace> {
        self.actions.iter().find_map(Action::variables)
    }

    /// Actions grouped by run order, ascending; declaration order within a group
    pub fn run_groups(&self) -> Vec<(u32, Vec<&Action>)> {
        let mut groups: BTreeMap<u32, Vec<&Action>> = BTreeMap::new();
        for action in &self.actions {
            groups.entry(action.run_order).or_default().push(action);
        }
        groups.into_iter().collect()
    }
}

/// Options for assembling a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Pipeline name
    pub name: String,
    /// Storage location artifacts are kept in
    pub artifact_store: String,
    /// Restart an in-flight execution when the definition changes
    pub restart_execution_on_update: bool,
}

impl PipelineOptions {
    pub fn new(name: impl Into<String>, artifact_store: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artifact_store: artifact_store.into(),
            restart_execution_on_update: false,
        }
    }
}

/// A validated pipeline topology
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pipeline {
    name: String,
    artifact_store: String,
    restart_execution_on_update: bool,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub(crate) fn new(options: PipelineOptions, stages: Vec<Stage>) -> Self {
        Self {
            name: options.name,
            artifact_store: options.artifact_store,
            restart_execution_on_update: options.restart_execution_on_update,
            stages,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact_store(&self) -> &str {
        &self.artifact_store
    }

    pub fn restart_execution_on_update(&self) -> bool {
        self.restart_execution_on_update
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Get a stage by name
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get all stage names
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Names of every artifact produced, in stage order
    pub fn artifact_names(&self) -> Vec<&str> {
        self.stages
            .iter()
            .flat_map(Stage::produced_artifacts)
            .map(Artifact::name)
            .collect()
    }

    /// Build project shared by the build actions
    pub fn build_project(&self) -> Option<&str> {
        self.stages
            .iter()
            .flat_map(|s| s.actions.iter())
            .find_map(|a| a.kind.project())
    }
}
