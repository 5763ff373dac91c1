//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use log::info;

use crate::config::ChainConfig;
use crate::dsp::EffectChain;
use crate::engine::io::{export_audio, import_audio, ExportFormat};
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use crate::params::{ParameterKind, PARAMETERS};

/// Everything needed to render one file
#[derive(Debug, Clone)]
pub struct RenderOptions<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub assignments: &'a [(String, f32)],
    pub config: Option<&'a Path>,
    pub block_size: usize,
    pub bit_depth: u16,
}

/// Render a WAV file through the chain and write the result
pub fn render(options: &RenderOptions<'_>) -> Result<()> {
    if options.block_size == 0 {
        return Err(FxError::InvalidBlockSize {
            block_size: options.block_size,
        });
    }

    let config = match options.config {
        Some(path) => ChainConfig::from_file(path)?,
        None => ChainConfig::default(),
    };

    let mut buffer = import_audio(options.input)?;
    info!(
        "Rendering {} ({} channels, {} samples at {} Hz)",
        options.input.display(),
        buffer.num_channels(),
        buffer.num_samples(),
        buffer.sample_rate
    );

    let mut chain = EffectChain::with_config(&config);
    let parameters = chain.parameters();
    for (name, value) in options.assignments {
        parameters.try_set(name, *value)?;
        info!("  {} = {}", name, parameters.get(name).unwrap_or(*value));
    }

    chain.prepare(
        buffer.sample_rate as f32,
        options.block_size,
        buffer.num_channels(),
    )?;
    process_offline(&mut chain, &mut buffer, options.block_size);

    export_audio(&buffer, options.output, ExportFormat::new(options.bit_depth))?;
    println!("Rendered: {}", options.output.display());
    Ok(())
}

/// Run a whole buffer through a prepared chain, `block_size` samples at a time
pub fn process_offline(chain: &mut EffectChain, buffer: &mut AudioBuffer, block_size: usize) {
    let block_size = block_size.max(1);
    let num_channels = buffer.num_channels();
    let mut block = AudioBuffer::new(num_channels, block_size, buffer.sample_rate);

    let mut start = 0;
    while start < buffer.num_samples() {
        let len = block_size.min(buffer.num_samples() - start);
        if len != block.num_samples() {
            block = AudioBuffer::new(num_channels, len, buffer.sample_rate);
        }

        for ch in 0..num_channels {
            block.channel_mut(ch)
                .copy_from_slice(&buffer.channel(ch)[start..start + len]);
        }
        chain.process(&mut block);
        for ch in 0..num_channels {
            buffer.channel_mut(ch)[start..start + len].copy_from_slice(block.channel(ch));
        }

        start += len;
    }
}

/// Print every parameter with its stage, range and default
pub fn list_params() {
    println!(
        "{:<18} {:<12} {:>10} {:>10} {:>10}  kind",
        "name", "stage", "min", "max", "default"
    );
    for descriptor in PARAMETERS {
        let kind = match descriptor.kind {
            ParameterKind::Continuous => "continuous",
            ParameterKind::Choice => "choice",
            ParameterKind::Toggle => "toggle",
        };
        println!(
            "{:<18} {:<12} {:>10} {:>10} {:>10}  {}",
            descriptor.name,
            descriptor.stage.as_str(),
            descriptor.min,
            descriptor.max,
            descriptor.default,
            kind
        );
    }
}
