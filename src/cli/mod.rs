//! CLI Module
//!
//! Command-line interface for the offline render tool.

pub mod commands;

use clap::Parser;
use std::path::PathBuf;

/// Render a WAV file through the multi-effect chain
#[derive(Parser, Debug)]
#[command(name = "multifx-render")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input WAV file
    #[arg(required_unless_present = "list_params")]
    pub input: Option<PathBuf>,

    /// Output WAV file
    #[arg(required_unless_present = "list_params")]
    pub output: Option<PathBuf>,

    /// Set a parameter before rendering (repeatable), e.g. --set drive=12
    #[arg(short, long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, f32)>,

    /// Chain configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Samples per processing block
    #[arg(short, long, default_value_t = 512)]
    pub block_size: usize,

    /// Output bit depth
    #[arg(long, default_value_t = 24, value_parser = parse_bit_depth)]
    pub bit_depth: u16,

    /// Print every parameter with its range and default, then exit
    #[arg(long)]
    pub list_params: bool,
}

/// Parse `name=value`
fn parse_assignment(arg: &str) -> std::result::Result<(String, f32), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{arg}'"));
    }
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}

/// Accept the bit depths the WAV writer supports
fn parse_bit_depth(arg: &str) -> std::result::Result<u16, String> {
    match arg.trim() {
        "16" => Ok(16),
        "24" => Ok(24),
        "32" => Ok(32),
        other => Err(format!("bit depth must be 16, 24 or 32, got '{other}'")),
    }
}
