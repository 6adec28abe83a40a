// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for pipewright.

pub mod graph;
pub mod init;
pub mod outputs;
pub mod synth;
pub mod validate;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{StackConfig, DEFAULT_CONFIG_FILE};
use crate::errors::PipewrightResult;

/// CI pipeline topology builder
///
/// Declare a source stage and a build stage, validate how they connect, and
/// synthesize a stack descriptor.
#[derive(Parser, Debug)]
#[clap(
    name = "pipewright",
    version,
    about = "CI pipeline topology builder: Git source, build stage, validated DAG",
    long_about = None,
    after_help = "Examples:\n\
        pipewright init --owner acme --repo widgets --branch main\n\
        pipewright validate                 Check the stack configuration\n\
        pipewright synth -o stack.json      Write the stack descriptor\n\
        pipewright graph --format mermaid   Show the action graph\n\n\
        See 'pipewright <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    #[clap(flatten)]
    pub overrides: RepositoryOverrides,
}

/// Repository coordinates that take precedence over the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct RepositoryOverrides {
    /// Repository owner
    #[clap(long, global = true, env = "PIPEWRIGHT_OWNER")]
    pub owner: Option<String>,

    /// Repository name
    #[clap(long, global = true, env = "PIPEWRIGHT_REPO")]
    pub repo: Option<String>,

    /// Branch to build
    #[clap(long, global = true, env = "PIPEWRIGHT_BRANCH")]
    pub branch: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter .pipewright.yaml
    Init {
        /// Overwrite an existing configuration
        #[clap(short, long)]
        force: bool,
    },

    /// Validate the stack configuration and pipeline topology
    Validate {
        /// Configuration file
        #[clap(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Synthesize the stack descriptor
    Synth {
        /// Configuration file
        #[clap(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "json")]
        format: SynthFormat,

        /// Write to a file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Fail if the descriptor in --output is out of date instead of writing it
        #[clap(long, requires = "output")]
        check: bool,
    },

    /// Show the pipeline as a graph of actions
    Graph {
        /// Configuration file
        #[clap(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// Print the named stack outputs
    Outputs {
        /// Configuration file
        #[clap(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Load configuration and apply command line overrides
pub(crate) fn load_config(
    path: &Path,
    overrides: &RepositoryOverrides,
) -> PipewrightResult<StackConfig> {
    let mut config = StackConfig::from_file(path)?;
    config.apply_overrides(
        overrides.owner.clone(),
        overrides.repo.clone(),
        overrides.branch.clone(),
    );
    Ok(config)
}

/// Output format for the outputs command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Descriptor format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthFormat {
    Json,
    Yaml,
}

impl std::str::FromStr for SynthFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(format!("Unknown descriptor format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_synth_arguments() {
        let cli = Cli::try_parse_from([
            "pipewright",
            "synth",
            "stack.yaml",
            "--format",
            "yaml",
            "--output",
            "out.yaml",
            "--check",
        ])
        .unwrap();

        match cli.command {
            Commands::Synth {
                config,
                format,
                output,
                check,
            } => {
                assert_eq!(config, PathBuf::from("stack.yaml"));
                assert_eq!(format, SynthFormat::Yaml);
                assert_eq!(output, Some(PathBuf::from("out.yaml")));
                assert!(check);
            }
            other => panic!("Expected synth command, got {:?}", other),
        }
    }

    #[test]
    fn test_check_requires_output() {
        assert!(Cli::try_parse_from(["pipewright", "synth", "--check"]).is_err());
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from(["pipewright", "graph", "--branch", "develop"]).unwrap();
        assert_eq!(cli.overrides.branch.as_deref(), Some("develop"));
    }

    #[test]
    fn test_unknown_graph_format_rejected() {
        assert!("svg".parse::<GraphFormat>().is_err());
        assert_eq!("DOT".parse::<GraphFormat>().unwrap(), GraphFormat::Dot);
    }
}
