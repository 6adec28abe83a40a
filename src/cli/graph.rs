// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Graph command - visualize the pipeline as a graph of actions

use miette::Result;
use std::path::PathBuf;

use super::{load_config, GraphFormat, RepositoryOverrides};
use crate::synth::PipelineStack;
use crate::topology::TopologyGraph;

/// Run the graph command
pub async fn run(
    config_path: PathBuf,
    overrides: RepositoryOverrides,
    format: GraphFormat,
    _verbose: bool,
) -> Result<()> {
    let config = load_config(&config_path, &overrides)?;
    let stack = PipelineStack::synthesize(&config)?;

    let graph = TopologyGraph::build(&stack.pipeline);

    let output = match format {
        GraphFormat::Text => graph.to_text(&stack.pipeline),
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
