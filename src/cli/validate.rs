// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Validate command - check configuration and pipeline topology

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_config, RepositoryOverrides};
use crate::errors::{PipewrightError, RecoverySuggestion};
use crate::synth::PipelineStack;
use crate::utils::{print_error, print_section, print_success};

/// Run the validate command
pub async fn run(config_path: PathBuf, overrides: RepositoryOverrides, verbose: bool) -> Result<()> {
    println!("{}", "Validating stack...".bold());
    println!();

    let config = match load_config(&config_path, &overrides) {
        Ok(config) => config,
        Err(e) => {
            report_failure(&e);
            return Err(e.into());
        }
    };
    print_success(&format!("{} parsed", config_path.display()));

    let stack = match PipelineStack::synthesize(&config) {
        Ok(stack) => stack,
        Err(e) => {
            report_failure(&e);
            return Err(e.into());
        }
    };

    print_success("Configuration is complete");
    print_success(&format!(
        "Topology is valid ({} stages, {} artifacts)",
        stack.pipeline.stages().len(),
        stack.pipeline.artifact_names().len()
    ));

    if verbose {
        print_section("Pipeline summary");
        println!("  Name: {}", stack.pipeline.name());
        println!("  Artifact store: {}", stack.bucket.arn());
        let cache: Vec<String> = stack
            .project
            .cache_modes()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "  Build project: {} ({}, {})",
            stack.project.name(),
            stack.project.image(),
            stack.project.compute_type()
        );
        println!(
            "    cache: {}",
            if cache.is_empty() { "off".to_string() } else { cache.join(", ") }
        );
        println!(
            "    plaintext secret check: {}",
            if stack.project.checks_plain_text_secrets() { "on" } else { "off" }
        );
        for stage in stack.pipeline.stages() {
            for action in &stage.actions {
                let inputs: Vec<&str> = action.inputs.iter().map(|a| a.name()).collect();
                let consumes = if inputs.is_empty() {
                    String::new()
                } else {
                    format!(" [consumes: {}]", inputs.join(", "))
                };
                println!(
                    "    - {}/{} ({}){}",
                    stage.name,
                    action.name,
                    action.kind.category(),
                    consumes.dimmed()
                );
            }
        }
    }

    println!();
    println!("{}", "Stack is valid!".green().bold());
    Ok(())
}

fn report_failure(error: &PipewrightError) {
    match error {
        PipewrightError::Topology { violations } => {
            println!("{}:", "Violations".red().bold());
            for violation in violations {
                print_error(&violation.to_string());
            }
        }
        other => print_error(&other.to_string()),
    }

    let suggestions = RecoverySuggestion::for_error(error);
    if !suggestions.is_empty() {
        print_section("How to fix");
        for suggestion in suggestions {
            println!("{}", suggestion);
        }
    }
    println!();
}
