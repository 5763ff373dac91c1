//! multifx-render - offline renderer
//!
//! Runs a WAV file through the multi-effect chain.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use multifx::cli::commands::{self, RenderOptions};
use multifx::cli::Cli;

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.list_params {
        commands::list_params();
        return Ok(());
    }

    let (Some(input), Some(output)) = (cli.input.as_deref(), cli.output.as_deref()) else {
        anyhow::bail!("input and output files are required");
    };

    info!("multifx-render v{}", env!("CARGO_PKG_VERSION"));

    commands::render(&RenderOptions {
        input,
        output,
        assignments: &cli.set,
        config: cli.config.as_deref(),
        block_size: cli.block_size,
        bit_depth: cli.bit_depth,
    })
    .with_context(|| format!("failed to render {}", input.display()))
}
