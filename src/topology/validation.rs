// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline assembly
//!
//! Validates cross-stage invariants in a single forward pass over the stages
//! in declared order. Each stage's consumed artifacts and namespaces are
//! checked against what strictly earlier stages produced; only then are the
//! stage's own productions added. Stage order is already total, so no cycle
//! search is needed.

use std::collections::{HashMap, HashSet};

use crate::errors::{PipewrightError, PipewrightResult, TopologyViolation};
use crate::topology::{Pipeline, PipelineOptions, Stage, VariablesNamespace, RUN_ORDER_RANGE};

/// Assemble a pipeline that keeps running executions on update
pub fn assemble_pipeline(
    name: &str,
    storage_location: &str,
    stages: Vec<Stage>,
) -> PipewrightResult<Pipeline> {
    assemble_pipeline_with(PipelineOptions::new(name, storage_location), stages)
}

/// Assemble a pipeline from explicit options
///
/// Fails with a topology error listing every violation found, or returns the
/// validated pipeline. There is no partial result.
pub fn assemble_pipeline_with(
    options: PipelineOptions,
    stages: Vec<Stage>,
) -> PipewrightResult<Pipeline> {
    if options.name.trim().is_empty() {
        return Err(PipewrightError::missing_field("pipeline.name"));
    }
    if options.artifact_store.trim().is_empty() {
        return Err(PipewrightError::missing_field("pipeline.artifact_bucket.name"));
    }

    let violations = TopologyValidator::validate(&stages);
    if !violations.is_empty() {
        tracing::debug!(
            pipeline = %options.name,
            violations = violations.len(),
            "pipeline topology rejected"
        );
        return Err(PipewrightError::Topology { violations });
    }

    tracing::info!(
        pipeline = %options.name,
        stages = stages.len(),
        "assembled pipeline"
    );

    Ok(Pipeline::new(options, stages))
}

/// Forward-pass topology validator
pub struct TopologyValidator;

impl TopologyValidator {
    /// Collect every invariant violation in `stages`
    pub fn validate(stages: &[Stage]) -> Vec<TopologyViolation> {
        let mut violations = Vec::new();

        if stages.is_empty() {
            violations.push(TopologyViolation::NoStages);
            return violations;
        }

        // Producers across the whole pipeline, so an ordering problem can be
        // told apart from a missing producer. First producer wins.
        let mut artifact_producers: HashMap<&str, &str> = HashMap::new();
        let mut namespace_publishers: HashMap<&str, &str> = HashMap::new();
        for stage in stages {
            for action in &stage.actions {
                for output in &action.outputs {
                    artifact_producers.entry(output.name()).or_insert(&stage.name);
                }
                if let Some(ns) = &action.variables_namespace {
                    namespace_publishers.entry(ns.as_str()).or_insert(&stage.name);
                }
            }
        }

        let mut stage_names = HashSet::new();
        let mut available_artifacts: HashMap<&str, &str> = HashMap::new();
        let mut available_namespaces: HashMap<&str, VariablesNamespace> = HashMap::new();
        let mut project: Option<&str> = None;

        for stage in stages {
            if !stage_names.insert(stage.name.as_str()) {
                violations.push(TopologyViolation::DuplicateStage {
                    stage: stage.name.clone(),
                });
            }
            if stage.actions.is_empty() {
                violations.push(TopologyViolation::EmptyStage {
                    stage: stage.name.clone(),
                });
            }

            Self::check_actions(stage, &mut project, &mut violations);
            Self::check_consumption(
                stage,
                &available_artifacts,
                &artifact_producers,
                &available_namespaces,
                &namespace_publishers,
                &mut violations,
            );

            // This stage's productions become visible to later stages only.
            let mut produced_here: HashMap<&str, &str> = HashMap::new();
            for action in &stage.actions {
                for output in &action.outputs {
                    let first = available_artifacts
                        .get(output.name())
                        .or_else(|| produced_here.get(output.name()))
                        .map(|s| s.to_string());
                    match first {
                        Some(first_stage) => {
                            violations.push(TopologyViolation::DuplicateArtifact {
                                artifact: output.name().to_string(),
                                first_stage,
                                second_stage: stage.name.clone(),
                            });
                        }
                        None => {
                            produced_here.insert(output.name(), &stage.name);
                        }
                    }
                }
            }
            available_artifacts.extend(produced_here);

            let mut published_here: HashMap<&str, VariablesNamespace> = HashMap::new();
            for action in &stage.actions {
                let (Some(name), Some(ns)) = (action.variables_namespace.as_deref(), action.variables())
                else {
                    continue;
                };
                if available_namespaces.contains_key(name) || published_here.contains_key(name) {
                    violations.push(TopologyViolation::DuplicateNamespace {
                        namespace: name.to_string(),
                        first_stage: namespace_publishers
                            .get(name)
                            .map(|s| s.to_string())
                            .unwrap_or_default(),
                        second_stage: stage.name.clone(),
                    });
                    continue;
                }
                published_here.insert(name, ns);
            }
            available_namespaces.extend(published_here);
        }

        violations
    }

    /// Per-action checks that do not depend on stage order
    fn check_actions<'a>(
        stage: &'a Stage,
        project: &mut Option<&'a str>,
        violations: &mut Vec<TopologyViolation>,
    ) {
        let mut action_names = HashSet::new();

        for action in &stage.actions {
            if !action_names.insert(action.name.as_str()) {
                violations.push(TopologyViolation::DuplicateAction {
                    stage: stage.name.clone(),
                    action: action.name.clone(),
                });
            }

            if !RUN_ORDER_RANGE.contains(&action.run_order) {
                violations.push(TopologyViolation::InvalidRunOrder {
                    stage: stage.name.clone(),
                    action: action.name.clone(),
                    run_order: action.run_order,
                });
            }

            if let Some(used) = action.kind.project() {
                match *project {
                    Some(expected) if expected != used => {
                        violations.push(TopologyViolation::MultipleBuildProjects {
                            stage: stage.name.clone(),
                            action: action.name.clone(),
                            project: used.to_string(),
                            expected: expected.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => *project = Some(used),
                }
            }
        }
    }

    /// Check consumed artifacts and referenced namespaces against strictly
    /// earlier stages
    fn check_consumption(
        stage: &Stage,
        available_artifacts: &HashMap<&str, &str>,
        artifact_producers: &HashMap<&str, &str>,
        available_namespaces: &HashMap<&str, VariablesNamespace>,
        namespace_publishers: &HashMap<&str, &str>,
        violations: &mut Vec<TopologyViolation>,
    ) {
        for action in &stage.actions {
            for input in &action.inputs {
                if available_artifacts.contains_key(input.name()) {
                    continue;
                }
                match artifact_producers.get(input.name()) {
                    Some(producer) => {
                        violations.push(TopologyViolation::ArtifactConsumedBeforeProduced {
                            artifact: input.name().to_string(),
                            stage: stage.name.clone(),
                            action: action.name.clone(),
                            producer: producer.to_string(),
                        });
                    }
                    None => violations.push(TopologyViolation::ArtifactNeverProduced {
                        artifact: input.name().to_string(),
                        stage: stage.name.clone(),
                        action: action.name.clone(),
                    }),
                }
            }

            for var in action.referenced_variables() {
                match available_namespaces.get(var.namespace.as_str()) {
                    Some(ns) if !ns.publishes(&var.variable) => {
                        violations.push(TopologyViolation::UnknownVariable {
                            namespace: var.namespace.clone(),
                            variable: var.variable.clone(),
                            stage: stage.name.clone(),
                            action: action.name.clone(),
                        });
                    }
                    Some(_) => {}
                    None => match namespace_publishers.get(var.namespace.as_str()) {
                        Some(publisher) => {
                            violations.push(TopologyViolation::NamespaceReferencedBeforePublished {
                                namespace: var.namespace.clone(),
                                stage: stage.name.clone(),
                                action: action.name.clone(),
                                publisher: publisher.to_string(),
                            });
                        }
                        None => violations.push(TopologyViolation::NamespaceNeverPublished {
                            namespace: var.namespace.clone(),
                            stage: stage.name.clone(),
                            action: action.name.clone(),
                        }),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{
        define_build_project, define_build_stage, define_source_stage, Action, ActionKind,
        Artifact, ComputeConfig, EnvironmentValue, SecretRef, SourceConfig, VariableRef,
        BUILD_ARTIFACT_NAME, SOURCE_ARTIFACT_NAME,
    };
    use miette::Diagnostic;
    use std::collections::BTreeMap;

    fn demo_stages() -> (Stage, Stage) {
        let config = SourceConfig::new(
            "acme",
            "widgets",
            "main",
            SecretRef::new("github/access", "DemoToken"),
        );
        let (source, artifact) = define_source_stage(&config).unwrap();
        let project = define_build_project(ComputeConfig::new("demo-project")).unwrap();
        let ns = source.variables().unwrap();
        let (build, _) = define_build_stage(&artifact, &project, &ns).unwrap();
        (source, build)
    }

    fn action(name: &str, inputs: &[&str], outputs: &[&str]) -> Action {
        Action {
            name: name.into(),
            run_order: 1,
            kind: ActionKind::CodeBuild {
                project: "demo-project".into(),
                environment: BTreeMap::new(),
            },
            inputs: inputs.iter().map(|n| Artifact::named(*n)).collect(),
            outputs: outputs.iter().map(|n| Artifact::named(*n)).collect(),
            variables_namespace: None,
        }
    }

    fn stage(name: &str, actions: Vec<Action>) -> Stage {
        Stage {
            name: name.into(),
            actions,
        }
    }

    #[test]
    fn test_end_to_end_assembly() {
        let (source, build) = demo_stages();

        let pipeline = assemble_pipeline("demo", "bucket-x", vec![source, build]).unwrap();

        assert_eq!(pipeline.name(), "demo");
        assert_eq!(pipeline.artifact_store(), "bucket-x");
        assert!(!pipeline.restart_execution_on_update());
        assert_eq!(
            pipeline.artifact_names(),
            vec![SOURCE_ARTIFACT_NAME, BUILD_ARTIFACT_NAME]
        );
        assert_eq!(pipeline.build_project(), Some("demo-project"));
    }

    #[test]
    fn test_reversed_stages_fail() {
        let (source, build) = demo_stages();

        let err = assemble_pipeline("demo", "bucket-x", vec![build, source]).unwrap_err();

        assert!(err.is_topology());
        assert!(err.violations().iter().any(|v| matches!(
            v,
            TopologyViolation::ArtifactConsumedBeforeProduced { artifact, .. }
                if artifact == SOURCE_ARTIFACT_NAME
        )));
        // Both the artifact and the namespace problem are reported
        assert!(err.violations().iter().any(|v| matches!(
            v,
            TopologyViolation::NamespaceReferencedBeforePublished { namespace, .. }
                if namespace == "SourceVariables"
        )));
    }

    #[test]
    fn test_provenance_requires_strictly_later_stage() {
        // (producer stage index, consumer stage index, expected success)
        for (i, j, ok) in [(0, 1, true), (0, 2, true), (1, 2, true), (1, 1, false), (2, 0, false), (2, 1, false)] {
            let mut stages: Vec<Stage> = (0..3)
                .map(|k| stage(&format!("stage-{}", k), vec![action(&format!("noop-{}", k), &[], &[])]))
                .collect();
            stages[i].actions.push(action("produce", &[], &["A"]));
            stages[j].actions.push(action("consume", &["A"], &[]));

            let result = assemble_pipeline("p", "b", stages);
            assert_eq!(result.is_ok(), ok, "producer {} consumer {}", i, j);
            if let Err(err) = result {
                assert!(err.is_topology());
            }
        }
    }

    #[test]
    fn test_unproduced_artifact_fails() {
        let stages = vec![
            stage("one", vec![action("a", &[], &["A"])]),
            stage("two", vec![action("b", &["B"], &[])]),
        ];

        let err = assemble_pipeline("p", "b", stages).unwrap_err();
        assert_eq!(
            err.violations(),
            &[TopologyViolation::ArtifactNeverProduced {
                artifact: "B".into(),
                stage: "two".into(),
                action: "b".into(),
            }]
        );
    }

    #[test]
    fn test_unpublished_namespace_named_in_error() {
        let mut environment = BTreeMap::new();
        environment.insert(
            "COMMIT_ID".to_string(),
            EnvironmentValue::Variable(VariableRef::new("Nowhere", "CommitId")),
        );
        let mut consumer = action("b", &["A"], &[]);
        consumer.kind = ActionKind::CodeBuild {
            project: "demo-project".into(),
            environment,
        };
        let stages = vec![
            stage("one", vec![action("a", &[], &["A"])]),
            stage("two", vec![consumer]),
        ];

        let err = assemble_pipeline("p", "b", stages).unwrap_err();
        assert!(err.violations().iter().any(|v| matches!(
            v,
            TopologyViolation::NamespaceNeverPublished { namespace, .. } if namespace == "Nowhere"
        )));
        assert!(err.related().is_some());
    }

    fn reading(name: &str, namespace: &str, variable: &str) -> Action {
        let mut environment = BTreeMap::new();
        environment.insert(
            "VALUE".to_string(),
            EnvironmentValue::Variable(VariableRef::new(namespace, variable)),
        );
        let mut reader = action(name, &[], &[]);
        reader.kind = ActionKind::CodeBuild {
            project: "demo-project".into(),
            environment,
        };
        reader
    }

    fn publishing(name: &str, namespace: &str) -> Action {
        let mut publisher = action(name, &[], &[]);
        publisher.variables_namespace = Some(namespace.into());
        publisher
    }

    #[test]
    fn test_duplicate_namespace_names_first_publisher() {
        let stages = vec![
            stage("one", vec![publishing("a", "BuildVars")]),
            stage("two", vec![action("b", &[], &[])]),
            stage("three", vec![publishing("c", "BuildVars")]),
        ];

        let err = assemble_pipeline("p", "b", stages).unwrap_err();
        assert_eq!(
            err.violations(),
            &[TopologyViolation::DuplicateNamespace {
                namespace: "BuildVars".into(),
                first_stage: "one".into(),
                second_stage: "three".into(),
            }]
        );
    }

    #[test]
    fn test_duplicate_namespace_within_one_stage() {
        let stages = vec![stage(
            "one",
            vec![publishing("a", "BuildVars"), publishing("b", "BuildVars")],
        )];

        let err = assemble_pipeline("p", "b", stages).unwrap_err();
        assert!(err.violations().iter().any(|v| matches!(
            v,
            TopologyViolation::DuplicateNamespace { first_stage, second_stage, .. }
                if first_stage == "one" && second_stage == "one"
        )));
    }

    #[test]
    fn test_namespace_read_in_publishing_stage_fails() {
        // Variables become visible only to strictly later stages
        let stages = vec![stage(
            "build",
            vec![publishing("a", "BuildVars"), reading("b", "BuildVars", "Version")],
        )];

        let err = assemble_pipeline("p", "b", stages).unwrap_err();
        assert_eq!(
            err.violations(),
            &[TopologyViolation::NamespaceReferencedBeforePublished {
                namespace: "BuildVars".into(),
                stage: "build".into(),
                action: "b".into(),
                publisher: "build".into(),
            }]
        );

        let stages = vec![
            stage("build", vec![publishing("a", "BuildVars")]),
            stage("deploy", vec![reading("b", "BuildVars", "Version")]),
        ];
        assert!(assemble_pipeline("p", "b", stages).is_ok());
    }

    #[test]
    fn test_duplicate_artifact_in_any_stage() {
        // Duplicate introduced in the same stage, a later stage, and by a
        // consumer stage further down
        let layouts = vec![
            vec![stage("one", vec![action("a", &[], &["A"]), action("b", &[], &["A"])])],
            vec![
                stage("one", vec![action("a", &[], &["A"])]),
                stage("two", vec![action("b", &[], &["A"])]),
            ],
            vec![
                stage("one", vec![action("a", &[], &["A"])]),
                stage("two", vec![action("b", &["A"], &["B"])]),
                stage("three", vec![action("c", &["B"], &["A"])]),
            ],
        ];

        for stages in layouts {
            let err = assemble_pipeline("p", "b", stages).unwrap_err();
            assert!(err
                .violations()
                .iter()
                .any(|v| matches!(v, TopologyViolation::DuplicateArtifact { artifact, .. } if artifact == "A")));
        }
    }

    #[test]
    fn test_collects_every_violation() {
        let mut bad_order = action("c", &[], &[]);
        bad_order.run_order = 0;
        let stages = vec![
            stage("one", vec![action("a", &["Missing"], &["A"]), action("a", &[], &[])]),
            stage("one", vec![bad_order]),
            stage("empty", vec![]),
        ];

        let err = assemble_pipeline("p", "b", stages).unwrap_err();
        let violations = err.violations();

        assert!(violations.contains(&TopologyViolation::DuplicateStage { stage: "one".into() }));
        assert!(violations.contains(&TopologyViolation::DuplicateAction {
            stage: "one".into(),
            action: "a".into(),
        }));
        assert!(violations.contains(&TopologyViolation::EmptyStage { stage: "empty".into() }));
        assert!(violations.iter().any(|v| matches!(v, TopologyViolation::InvalidRunOrder { run_order: 0, .. })));
        assert!(violations.iter().any(|v| matches!(v, TopologyViolation::ArtifactNeverProduced { .. })));
    }

    #[test]
    fn test_unknown_source_variable() {
        let (source, build) = demo_stages();
        let mut build = build;
        if let ActionKind::CodeBuild { environment, .. } = &mut build.actions[0].kind {
            environment.insert(
                "BUILD_NUMBER".into(),
                EnvironmentValue::Variable(VariableRef::new("SourceVariables", "BuildNumber")),
            );
        }

        let err = assemble_pipeline("demo", "bucket-x", vec![source, build]).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert!(matches!(
            &err.violations()[0],
            TopologyViolation::UnknownVariable { variable, .. } if variable == "BuildNumber"
        ));
    }

    #[test]
    fn test_single_build_project() {
        let mut other = action("b", &["A"], &[]);
        other.kind = ActionKind::CodeBuild {
            project: "other-project".into(),
            environment: BTreeMap::new(),
        };
        let stages = vec![
            stage("one", vec![action("a", &[], &["A"])]),
            stage("two", vec![other]),
        ];

        let err = assemble_pipeline("p", "b", stages).unwrap_err();
        assert!(matches!(
            &err.violations()[0],
            TopologyViolation::MultipleBuildProjects { project, expected, .. }
                if project == "other-project" && expected == "demo-project"
        ));
    }

    #[test]
    fn test_empty_pipeline_and_blank_name() {
        let err = assemble_pipeline("p", "b", vec![]).unwrap_err();
        assert_eq!(err.violations(), &[TopologyViolation::NoStages]);

        let (source, build) = demo_stages();
        let err = assemble_pipeline(" ", "b", vec![source, build]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_restart_policy_carried() {
        let (source, build) = demo_stages();
        let mut options = PipelineOptions::new("demo", "bucket-x");
        options.restart_execution_on_update = true;

        let pipeline = assemble_pipeline_with(options, vec![source, build]).unwrap();
        assert!(pipeline.restart_execution_on_update());
    }
}
