// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Build project descriptor
//!
//! The compute environment every build action runs on. One project is built
//! per stack and handed by reference to each build stage.

use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

/// Container image builds run in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum BuildImage {
    #[default]
    #[serde(rename = "standard-5.0")]
    Standard5,
    #[serde(rename = "standard-6.0")]
    Standard6,
    #[serde(rename = "standard-7.0")]
    Standard7,
}

impl BuildImage {
    /// Image identifier understood by the build service
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Standard5 => "aws/codebuild/standard:5.0",
            Self::Standard6 => "aws/codebuild/standard:6.0",
            Self::Standard7 => "aws/codebuild/standard:7.0",
        }
    }
}

impl std::fmt::Display for BuildImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl std::str::FromStr for BuildImage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard-5.0" | "standard:5.0" => Ok(Self::Standard5),
            "standard-6.0" | "standard:6.0" => Ok(Self::Standard6),
            "standard-7.0" | "standard:7.0" => Ok(Self::Standard7),
            _ => Err(format!(
                "Unknown build image: {} (expected standard-5.0, standard-6.0 or standard-7.0)",
                s
            )),
        }
    }
}

/// Compute size of the build host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    #[default]
    Small,
    Medium,
    Large,
}

impl ComputeType {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Small => "BUILD_GENERAL1_SMALL",
            Self::Medium => "BUILD_GENERAL1_MEDIUM",
            Self::Large => "BUILD_GENERAL1_LARGE",
        }
    }
}

impl std::fmt::Display for ComputeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
        }
    }
}

impl std::str::FromStr for ComputeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(format!("Unknown compute type: {} (expected small, medium or large)", s)),
        }
    }
}

/// Build cache strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    None,
    LocalSource,
    LocalCustom,
    LocalDockerLayer,
}

impl CacheMode {
    /// Local cache mode identifier, `None` for [`CacheMode::None`]
    pub fn identifier(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::LocalSource => Some("LOCAL_SOURCE_CACHE"),
            Self::LocalCustom => Some("LOCAL_CUSTOM_CACHE"),
            Self::LocalDockerLayer => Some("LOCAL_DOCKER_LAYER_CACHE"),
        }
    }
}

impl std::fmt::Display for CacheMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::LocalSource => write!(f, "local-source"),
            Self::LocalCustom => write!(f, "local-custom"),
            Self::LocalDockerLayer => write!(f, "local-docker-layer"),
        }
    }
}

impl std::str::FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "local-source" => Ok(Self::LocalSource),
            "local-custom" => Ok(Self::LocalCustom),
            "local-docker-layer" => Ok(Self::LocalDockerLayer),
            _ => Err(format!(
                "Unknown cache mode: {} (expected none, local-source, local-custom or local-docker-layer)",
                s
            )),
        }
    }
}

/// Default cache modes: source and custom local caches
pub fn default_cache_modes() -> Vec<CacheMode> {
    vec![CacheMode::LocalSource, CacheMode::LocalCustom]
}

/// Inputs for [`define_build_project`](crate::topology::define_build_project)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeConfig {
    pub project_name: String,
    pub description: Option<String>,
    pub image: BuildImage,
    pub compute_type: ComputeType,
    pub cache: Vec<CacheMode>,
    /// How long a build may wait in the queue
    pub queued_timeout: Duration,
    /// How long a build may run
    pub timeout: Duration,
    pub check_secrets_in_plain_text_env_variables: bool,
}

impl ComputeConfig {
    /// Configuration with the documented defaults
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            description: None,
            image: BuildImage::default(),
            compute_type: ComputeType::default(),
            cache: default_cache_modes(),
            queued_timeout: Duration::from_secs(15 * 60),
            timeout: Duration::from_secs(5 * 60),
            check_secrets_in_plain_text_env_variables: true,
        }
    }
}

/// A shared build environment referenced by build actions
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BuildProject {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(serialize_with = "serialize_image")]
    image: BuildImage,
    #[serde(serialize_with = "serialize_compute_type")]
    compute_type: ComputeType,
    #[serde(serialize_with = "serialize_cache")]
    cache: Vec<CacheMode>,
    #[serde(rename = "queued_timeout_minutes", serialize_with = "serialize_minutes")]
    queued_timeout: Duration,
    #[serde(rename = "timeout_minutes", serialize_with = "serialize_minutes")]
    timeout: Duration,
    check_secrets_in_plain_text_env_variables: bool,
}

impl BuildProject {
    pub(crate) fn from_config(config: ComputeConfig) -> Self {
        let mut cache = config.cache;
        cache.sort();
        cache.dedup();

        Self {
            name: config.project_name,
            description: config.description,
            image: config.image,
            compute_type: config.compute_type,
            cache,
            queued_timeout: config.queued_timeout,
            timeout: config.timeout,
            check_secrets_in_plain_text_env_variables: config
                .check_secrets_in_plain_text_env_variables,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn image(&self) -> BuildImage {
        self.image
    }

    pub fn compute_type(&self) -> ComputeType {
        self.compute_type
    }

    /// Local cache modes in effect (empty when caching is off)
    pub fn cache_modes(&self) -> Vec<CacheMode> {
        self.cache
            .iter()
            .copied()
            .filter(|m| *m != CacheMode::None)
            .collect()
    }

    pub fn queued_timeout(&self) -> Duration {
        self.queued_timeout
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn checks_plain_text_secrets(&self) -> bool {
        self.check_secrets_in_plain_text_env_variables
    }
}

fn serialize_image<S: Serializer>(image: &BuildImage, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(image.identifier())
}

fn serialize_compute_type<S: Serializer>(ct: &ComputeType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(ct.identifier())
}

fn serialize_cache<S: Serializer>(modes: &[CacheMode], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(modes.iter().filter_map(CacheMode::identifier))
}

// Partial minutes round up; the build service only accepts whole minutes.
fn serialize_minutes<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    let minutes = d.as_nanos().div_ceil(60 * 1_000_000_000);
    s.serialize_u64(u64::try_from(minutes).unwrap_or(u64::MAX))
}
