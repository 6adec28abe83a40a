// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Outputs command - print the values the stack exports

use miette::Result;
use std::path::PathBuf;

use super::{load_config, OutputFormat, RepositoryOverrides};
use crate::errors::PipewrightError;
use crate::synth::PipelineStack;
use crate::utils::{bold, code, print_header};

/// Run the outputs command
pub async fn run(
    config_path: PathBuf,
    overrides: RepositoryOverrides,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let config = load_config(&config_path, &overrides)?;
    let stack = PipelineStack::synthesize(&config)?;

    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&stack.outputs).map_err(PipewrightError::from)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            print_header(&format!("Outputs of {}", stack.name));
            let width = stack.outputs.iter().map(|o| o.name.len()).max().unwrap_or(0);
            for output in &stack.outputs {
                let name = format!("{:width$}", output.name, width = width);
                println!("  {}  {}", bold(&name), code(&output.value));
            }
        }
    }

    Ok(())
}
