// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Stage and project definitions
//!
//! Each function takes explicit inputs and returns a fresh value. Bad input is
//! rejected by the call that received it, before any descriptor exists.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::errors::{PipewrightError, PipewrightResult};
use crate::topology::{
    Action, ActionKind, Artifact, BuildProject, CacheMode, ComputeConfig, EnvironmentValue, SecretRef,
    Stage, TriggerMode, VariablesNamespace,
};

/// Name of the stage that retrieves sources
pub const SOURCE_STAGE_NAME: &str = "RetrieveStage";
/// Name of the source retrieval action
pub const SOURCE_ACTION_NAME: &str = "DownloadSource";
/// Artifact holding the retrieved sources
pub const SOURCE_ARTIFACT_NAME: &str = "GithubSource";
/// Namespace the source action publishes commit metadata under
pub const SOURCE_NAMESPACE: &str = "SourceVariables";

/// Shortest queued or run timeout a build project accepts
pub const MIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Name of the stage that validates and builds sources
pub const BUILD_STAGE_NAME: &str = "ValidateAndBuildSources";
/// Name of the build action
pub const BUILD_ACTION_NAME: &str = "BuildArtifacts";
/// Artifact produced by the build
pub const BUILD_ARTIFACT_NAME: &str = "CIArtifact";
/// Namespace the build action publishes exported variables under
pub const BUILD_NAMESPACE: &str = "ValidateAndBuildSources";

/// Repository coordinates and credentials for the source stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub oauth_token: SecretRef,
    pub trigger: TriggerMode,
}

impl SourceConfig {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        oauth_token: SecretRef,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            oauth_token,
            trigger: TriggerMode::default(),
        }
    }
}

/// An upstream variable copied into the build environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedVariable {
    /// Environment variable name inside the build
    pub env_name: String,
    /// Variable read from the upstream namespace
    pub variable: String,
}

impl ForwardedVariable {
    pub fn new(env_name: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            env_name: env_name.into(),
            variable: variable.into(),
        }
    }
}

/// Variables forwarded by [`define_build_stage`]: commit id and committer date
pub fn default_forwarded_variables() -> Vec<ForwardedVariable> {
    vec![
        ForwardedVariable::new("COMMIT_ID", "CommitId"),
        ForwardedVariable::new("COMMITTER_DATE", "CommitterDate"),
    ]
}

fn require(field: &str, value: &str) -> PipewrightResult<()> {
    if value.trim().is_empty() {
        return Err(PipewrightError::missing_field(field));
    }
    Ok(())
}

/// Define the stage that retrieves a branch from a hosted Git repository
///
/// The stage holds one action that outputs the `GithubSource` artifact and
/// publishes commit metadata under the `SourceVariables` namespace.
pub fn define_source_stage(config: &SourceConfig) -> PipewrightResult<(Stage, Artifact)> {
    require("repository.owner", &config.owner)?;
    require("repository.name", &config.repo)?;
    require("repository.branch", &config.branch)?;
    require("repository.oauth_token.secret_id", &config.oauth_token.secret_id)?;
    require("repository.oauth_token.json_field", &config.oauth_token.json_field)?;

    let owner = config.owner.trim();
    let repo = config.repo.trim();
    let branch = config.branch.trim();
    let output = Artifact::produced_in(SOURCE_ARTIFACT_NAME, SOURCE_STAGE_NAME);

    let action = Action {
        name: SOURCE_ACTION_NAME.into(),
        run_order: 1,
        kind: ActionKind::GitHubSource {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            oauth_token: config.oauth_token.clone(),
            trigger: config.trigger,
        },
        inputs: vec![],
        outputs: vec![output.clone()],
        variables_namespace: Some(SOURCE_NAMESPACE.into()),
    };

    tracing::debug!(owner, repo, branch, "defined source stage");

    Ok((
        Stage {
            name: SOURCE_STAGE_NAME.into(),
            actions: vec![action],
        },
        output,
    ))
}

/// Define the build stage, forwarding commit id and committer date
pub fn define_build_stage(
    input: &Artifact,
    project: &BuildProject,
    upstream: &VariablesNamespace,
) -> PipewrightResult<(Stage, Artifact)> {
    define_build_stage_with(input, project, upstream, &default_forwarded_variables())
}

/// Define the build stage, forwarding the given upstream variables
///
/// The input artifact must come from a stage definition; a bare
/// [`Artifact::named`] has no producer and is rejected.
pub fn define_build_stage_with(
    input: &Artifact,
    project: &BuildProject,
    upstream: &VariablesNamespace,
    forwarded: &[ForwardedVariable],
) -> PipewrightResult<(Stage, Artifact)> {
    if input.producer().is_none() {
        return Err(PipewrightError::Configuration {
            field: "build.input".into(),
            reason: format!(
                "artifact '{}' was not produced by an earlier stage",
                input.name()
            ),
            help: Some("Pass the artifact returned by the upstream stage definition".into()),
        });
    }

    let mut environment = BTreeMap::new();
    for fwd in forwarded {
        require("build.forward_variables", &fwd.env_name)?;
        if !upstream.publishes(&fwd.variable) {
            return Err(PipewrightError::invalid_value(
                "build.forward_variables",
                format!(
                    "namespace '{}' does not publish variable '{}'",
                    upstream.name(),
                    fwd.variable
                ),
            ));
        }
        environment.insert(
            fwd.env_name.clone(),
            EnvironmentValue::Variable(upstream.variable(&fwd.variable)),
        );
    }

    let output = Artifact::produced_in(BUILD_ARTIFACT_NAME, BUILD_STAGE_NAME);

    let action = Action {
        name: BUILD_ACTION_NAME.into(),
        run_order: 1,
        kind: ActionKind::CodeBuild {
            project: project.name().to_string(),
            environment,
        },
        inputs: vec![input.clone()],
        outputs: vec![output.clone()],
        variables_namespace: Some(BUILD_NAMESPACE.into()),
    };

    tracing::debug!(
        input = %input,
        project = project.name(),
        forwarded = forwarded.len(),
        "defined build stage"
    );

    Ok((
        Stage {
            name: BUILD_STAGE_NAME.into(),
            actions: vec![action],
        },
        output,
    ))
}

/// Define the single build project shared by all build actions
pub fn define_build_project(config: ComputeConfig) -> PipewrightResult<BuildProject> {
    require("build.project_name", &config.project_name)?;

    if config.queued_timeout < MIN_TIMEOUT {
        return Err(PipewrightError::invalid_value(
            "build.queued_timeout_minutes",
            "timeout must be at least one minute",
        ));
    }
    if config.timeout < MIN_TIMEOUT {
        return Err(PipewrightError::invalid_value(
            "build.timeout_minutes",
            "timeout must be at least one minute",
        ));
    }

    if config.cache.contains(&CacheMode::None) && config.cache.len() > 1 {
        return Err(PipewrightError::invalid_value(
            "build.cache",
            "'none' cannot be combined with local cache modes",
        ));
    }

    Ok(BuildProject::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_config(owner: &str, repo: &str, branch: &str) -> SourceConfig {
        SourceConfig::new(owner, repo, branch, SecretRef::new("github/access", "DemoToken"))
    }

    fn project() -> BuildProject {
        define_build_project(ComputeConfig::new("demo-project")).unwrap()
    }

    #[test]
    fn test_source_stage_shape() {
        for (owner, repo, branch) in [
            ("acme", "widgets", "main"),
            ("octo-org", "api.server", "release/2.x"),
            ("a", "b", "c"),
        ] {
            let (stage, artifact) = define_source_stage(&source_config(owner, repo, branch)).unwrap();

            assert_eq!(stage.actions.len(), 1);
            assert_eq!(stage.actions[0].outputs.len(), 1);
            assert_eq!(stage.actions[0].outputs[0].name(), artifact.name());
            assert_eq!(artifact.name(), SOURCE_ARTIFACT_NAME);
            assert_ne!(artifact.name(), BUILD_ARTIFACT_NAME);
            assert_eq!(artifact.producer(), Some(SOURCE_STAGE_NAME));
        }
    }

    #[test]
    fn test_source_stage_trims_coordinates() {
        let (stage, _) =
            define_source_stage(&source_config(" acme ", "\twidgets", "main\n")).unwrap();

        match &stage.actions[0].kind {
            ActionKind::GitHubSource {
                owner,
                repo,
                branch,
                ..
            } => {
                assert_eq!(owner, "acme");
                assert_eq!(repo, "widgets");
                assert_eq!(branch, "main");
            }
            other => panic!("Expected GitHubSource action, got {:?}", other),
        }
    }

    #[test]
    fn test_source_stage_publishes_commit_metadata() {
        let (stage, _) = define_source_stage(&source_config("acme", "widgets", "main")).unwrap();

        let ns = stage.variables().unwrap();
        assert_eq!(ns.name(), SOURCE_NAMESPACE);
        assert!(ns.publishes("CommitId"));
        assert!(ns.publishes("CommitterDate"));
    }

    #[test]
    fn test_source_stage_rejects_empty_coordinates() {
        for (owner, repo, branch, field) in [
            ("", "widgets", "main", "repository.owner"),
            ("acme", "  ", "main", "repository.name"),
            ("acme", "widgets", "", "repository.branch"),
        ] {
            let err = define_source_stage(&source_config(owner, repo, branch)).unwrap_err();
            match err {
                PipewrightError::Configuration { field: f, .. } => assert_eq!(f, field),
                other => panic!("Expected configuration error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_build_stage_forwards_commit_variables() {
        let (source, artifact) = define_source_stage(&source_config("acme", "widgets", "main")).unwrap();
        let ns = source.variables().unwrap();

        let (stage, output) = define_build_stage(&artifact, &project(), &ns).unwrap();

        assert_eq!(output.name(), BUILD_ARTIFACT_NAME);
        let action = &stage.actions[0];
        assert_eq!(action.inputs[0].name(), SOURCE_ARTIFACT_NAME);
        match &action.kind {
            ActionKind::CodeBuild { project, environment } => {
                assert_eq!(project, "demo-project");
                assert_eq!(environment.len(), 2);
                assert_eq!(
                    environment["COMMIT_ID"].to_string(),
                    "#{SourceVariables.CommitId}"
                );
                assert_eq!(
                    environment["COMMITTER_DATE"].to_string(),
                    "#{SourceVariables.CommitterDate}"
                );
            }
            _ => panic!("Expected CodeBuild action"),
        }
    }

    #[test]
    fn test_build_stage_rejects_unproduced_input() {
        let ns = VariablesNamespace::open(SOURCE_NAMESPACE);
        let err = define_build_stage(&Artifact::named("GithubSource"), &project(), &ns).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("GithubSource"));
    }

    #[test]
    fn test_build_stage_rejects_unpublished_variable() {
        let (source, artifact) = define_source_stage(&source_config("acme", "widgets", "main")).unwrap();
        let ns = source.variables().unwrap();

        let err = define_build_stage_with(
            &artifact,
            &project(),
            &ns,
            &[ForwardedVariable::new("BUILD_NUMBER", "BuildNumber")],
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_project_rejects_zero_timeouts() {
        let mut config = ComputeConfig::new("demo-project");
        config.timeout = Duration::ZERO;
        assert!(define_build_project(config).unwrap_err().is_configuration());

        let mut config = ComputeConfig::new("demo-project");
        config.queued_timeout = Duration::ZERO;
        assert!(define_build_project(config).unwrap_err().is_configuration());
    }

    #[test]
    fn test_build_project_rejects_sub_minute_timeouts() {
        for timeout in [Duration::from_millis(500), Duration::from_secs(59)] {
            let mut config = ComputeConfig::new("demo-project");
            config.timeout = timeout;
            match define_build_project(config).unwrap_err() {
                PipewrightError::Configuration { field, .. } => {
                    assert_eq!(field, "build.timeout_minutes")
                }
                other => panic!("Expected configuration error, got {:?}", other),
            }
        }

        let mut config = ComputeConfig::new("demo-project");
        config.queued_timeout = MIN_TIMEOUT;
        config.timeout = MIN_TIMEOUT;
        assert!(define_build_project(config).is_ok());
    }

    #[test]
    fn test_build_project_allows_equal_timeouts() {
        let mut config = ComputeConfig::new("demo-project");
        config.queued_timeout = Duration::from_secs(600);
        config.timeout = Duration::from_secs(600);

        let project = define_build_project(config).unwrap();
        assert_eq!(project.queued_timeout(), project.timeout());
    }

    #[test]
    fn test_build_project_rejects_none_with_local_cache() {
        let mut config = ComputeConfig::new("demo-project");
        config.cache = vec![CacheMode::None, CacheMode::LocalSource];
        assert!(define_build_project(config).unwrap_err().is_configuration());
    }
}
