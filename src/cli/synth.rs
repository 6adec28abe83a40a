// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Synth command - write the stack descriptor

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_config, RepositoryOverrides, SynthFormat};
use crate::errors::PipewrightError;
use crate::synth::{PipelineStack, StackDescriptor};
use crate::utils::{print_info, print_success};

/// Run the synth command
pub async fn run(
    config_path: PathBuf,
    overrides: RepositoryOverrides,
    format: SynthFormat,
    output: Option<PathBuf>,
    check: bool,
    verbose: bool,
) -> Result<()> {
    let config = load_config(&config_path, &overrides)?;
    let stack = PipelineStack::synthesize(&config)?;
    let descriptor = StackDescriptor::new(&stack)?;

    let rendered = match format {
        SynthFormat::Json => descriptor.to_json()?,
        SynthFormat::Yaml => descriptor.to_yaml()?,
    };

    let Some(path) = output else {
        print!("{}", rendered);
        return Ok(());
    };

    if check {
        let existing = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(PipewrightError::FileReadError {
                    path,
                    error: e.to_string(),
                }
                .into())
            }
        };

        if !descriptor.is_current(&existing) {
            return Err(miette::miette!(
                help = "Run 'pipewright synth' without --check to regenerate it",
                "{} is out of date",
                path.display()
            ));
        }

        print_success(&format!(
            "{} is up to date ({})",
            path.display(),
            short_fingerprint(descriptor.fingerprint()).dimmed()
        ));
        return Ok(());
    }

    tokio::fs::write(&path, &rendered)
        .await
        .map_err(|e| PipewrightError::FileWriteError {
            path: path.clone(),
            error: e.to_string(),
        })?;

    tracing::debug!(path = %path.display(), fingerprint = descriptor.fingerprint(), "wrote descriptor");

    print_success(&format!("Wrote {}", path.display()));
    if verbose {
        print_info(&format!(
            "fingerprint {}",
            short_fingerprint(descriptor.fingerprint())
        ));
    }

    Ok(())
}

fn short_fingerprint(fingerprint: &str) -> &str {
    &fingerprint[..fingerprint.len().min(12)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_check() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("stack.yaml");
        let output = temp_dir.path().join("stack.json");
        std::fs::write(
            &config,
            StackConfig::starter("acme", "widgets", "main").to_yaml().unwrap(),
        )
        .unwrap();

        run(
            config.clone(),
            RepositoryOverrides::default(),
            SynthFormat::Json,
            Some(output.clone()),
            false,
            false,
        )
        .await
        .unwrap();
        assert!(output.exists());

        run(
            config.clone(),
            RepositoryOverrides::default(),
            SynthFormat::Json,
            Some(output.clone()),
            true,
            false,
        )
        .await
        .unwrap();

        let overrides = RepositoryOverrides {
            branch: Some("develop".into()),
            ..Default::default()
        };
        let stale = run(config, overrides, SynthFormat::Json, Some(output), true, false).await;
        assert!(stale.is_err());
    }
}
