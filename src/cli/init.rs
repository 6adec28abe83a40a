// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Init command - write a starter stack configuration

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::RepositoryOverrides;
use crate::config::{StackConfig, DEFAULT_CONFIG_FILE};
use crate::errors::PipewrightError;
use crate::utils::print_success;

/// Run the init command
pub async fn run(overrides: RepositoryOverrides, force: bool, verbose: bool) -> Result<()> {
    let repo = overrides.repo.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "my-repo".to_string())
    });
    let owner = overrides.owner.unwrap_or_else(|| "my-org".to_string());
    let branch = overrides.branch.unwrap_or_else(|| "main".to_string());

    println!("{}", "Initializing pipewright stack...".bold());
    println!();

    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() && !force {
        return Err(miette::miette!(
            help = "Pass --force to overwrite it",
            "{} already exists",
            DEFAULT_CONFIG_FILE
        ));
    }

    let config = StackConfig::starter(&owner, &repo, &branch);
    let content = format!(
        "# pipewright stack configuration\n\
         # Repository coordinates may be overridden with --owner/--repo/--branch.\n\n{}",
        config.to_yaml()?
    );

    tokio::fs::write(path, &content)
        .await
        .map_err(|e| PipewrightError::FileWriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

    print_success(&format!("Created {}", DEFAULT_CONFIG_FILE));
    println!();
    println!("{}", "Stack initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit {} to point at your repository and bucket",
        DEFAULT_CONFIG_FILE.cyan()
    );
    println!("  2. Run {} to check the pipeline", "pipewright validate".cyan());
    println!("  3. Run {} to write the descriptor", "pipewright synth -o stack.json".cyan());
    println!();

    if verbose {
        println!("{}", "Generated configuration:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}
