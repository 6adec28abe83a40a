// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Stack descriptor document
//!
//! The document handed to the external renderer. It carries a BLAKE3
//! fingerprint of its own content so a checked-in copy can be tested for
//! staleness without diffing.

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use super::{PipelineStack, StackOutput, StorageLocation};
use crate::errors::PipewrightResult;
use crate::topology::{BuildProject, Pipeline};

/// Descriptor format version
pub const DESCRIPTOR_VERSION: &str = "1";

#[derive(Debug, Serialize)]
struct DescriptorBody<'a> {
    version: &'static str,
    stack: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    artifact_bucket: &'a StorageLocation,
    build_project: NestedProject<'a>,
    pipeline: &'a Pipeline,
    outputs: &'a [StackOutput],
}

/// The build project together with the nested stack that declares it
#[derive(Debug, Serialize)]
struct NestedProject<'a> {
    stack: &'a str,
    #[serde(flatten)]
    project: &'a BuildProject,
}

/// Serializable view of a synthesized stack
#[derive(Debug, Serialize)]
pub struct StackDescriptor<'a> {
    #[serde(flatten)]
    body: DescriptorBody<'a>,
    fingerprint: String,
}

#[derive(Deserialize)]
struct Fingerprinted {
    fingerprint: Option<String>,
}

impl<'a> StackDescriptor<'a> {
    /// Describe `stack`, fingerprinting the canonical JSON of its content
    pub fn new(stack: &'a PipelineStack) -> PipewrightResult<Self> {
        let body = DescriptorBody {
            version: DESCRIPTOR_VERSION,
            stack: &stack.name,
            description: stack.description.as_deref(),
            artifact_bucket: &stack.bucket,
            build_project: NestedProject {
                stack: &stack.build_stack,
                project: &stack.project,
            },
            pipeline: &stack.pipeline,
            outputs: &stack.outputs,
        };

        let mut hasher = Hasher::new();
        hasher.update(serde_json::to_string(&body)?.as_bytes());
        let fingerprint = hasher.finalize().to_hex().to_string();

        Ok(Self { body, fingerprint })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> PipewrightResult<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> PipewrightResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Whether a previously written descriptor (JSON or YAML) matches this one
    pub fn is_current(&self, existing: &str) -> bool {
        match serde_yaml::from_str::<Fingerprinted>(existing) {
            Ok(Fingerprinted {
                fingerprint: Some(fp),
            }) => fp == self.fingerprint,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;

    fn stack(branch: &str) -> PipelineStack {
        PipelineStack::synthesize(&StackConfig::starter("acme", "widgets", branch)).unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = stack("main");
        let b = stack("main");

        let fp = StackDescriptor::new(&a).unwrap().fingerprint().to_string();
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, StackDescriptor::new(&b).unwrap().fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let main = stack("main");
        let develop = stack("develop");

        assert_ne!(
            StackDescriptor::new(&main).unwrap().fingerprint(),
            StackDescriptor::new(&develop).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_json_descriptor_shape() {
        let stack = stack("main");
        let descriptor = StackDescriptor::new(&stack).unwrap();
        let json: serde_json::Value = serde_json::from_str(&descriptor.to_json().unwrap()).unwrap();

        assert_eq!(json["version"], "1");
        assert_eq!(json["stack"], "pipewright-codepipeline");
        assert_eq!(json["artifact_bucket"]["removal_policy"], "destroy");
        assert_eq!(json["build_project"]["stack"], "pipewright-codepipeline-codebuild");
        assert_eq!(json["build_project"]["name"], "widgets-codebuild-project");
        assert_eq!(json["build_project"]["compute_type"], "BUILD_GENERAL1_SMALL");
        assert_eq!(json["pipeline"]["stages"][0]["name"], "RetrieveStage");
        let source = &json["pipeline"]["stages"][0]["actions"][0];
        assert_eq!(source["provider"], "GitHub");
        assert_eq!(source["trigger"], "WebHook");
        assert_eq!(
            source["oauth_token"],
            "{{resolve:secretsmanager:github/access:SecretString:DemoToken}}"
        );
        assert_eq!(
            json["pipeline"]["stages"][1]["actions"][0]["inputs"][0]["name"],
            "GithubSource"
        );
        assert_eq!(json["outputs"][1]["name"], "OutputS3BucketArn");
        assert_eq!(json["fingerprint"], descriptor.fingerprint());
    }

    #[test]
    fn test_is_current_reads_json_and_yaml() {
        let main = stack("main");
        let descriptor = StackDescriptor::new(&main).unwrap();

        assert!(descriptor.is_current(&descriptor.to_json().unwrap()));
        assert!(descriptor.is_current(&descriptor.to_yaml().unwrap()));

        let develop = stack("develop");
        let stale = StackDescriptor::new(&develop).unwrap().to_json().unwrap();
        assert!(!descriptor.is_current(&stale));
        assert!(!descriptor.is_current("not a descriptor"));
    }
}
