// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! pipewright - CI pipeline topology builder

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipewright::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pipewright=debug"
    } else {
        "pipewright=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let overrides = cli.overrides;

    match cli.command {
        Commands::Init { force } => pipewright::cli::init::run(overrides, force, cli.verbose).await,
        Commands::Validate { config } => {
            pipewright::cli::validate::run(config, overrides, cli.verbose).await
        }
        Commands::Synth {
            config,
            format,
            output,
            check,
        } => {
            pipewright::cli::synth::run(config, overrides, format, output, check, cli.verbose).await
        }
        Commands::Graph { config, format } => {
            pipewright::cli::graph::run(config, overrides, format, cli.verbose).await
        }
        Commands::Outputs { config, format } => {
            pipewright::cli::outputs::run(config, overrides, format, cli.verbose).await
        }
    }
}
