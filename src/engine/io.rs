//! WAV file I/O
//!
//! Imports 16/24/32-bit integer and 32-bit float WAV files into an
//! `AudioBuffer` at the file's own sample rate, and exports buffers back.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::dsp::MAX_CHANNELS;
use crate::engine::buffer::AudioBuffer;
use crate::error::{FxError, Result};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24 (integer) or 32 (float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 24 }
    }
}

impl ExportFormat {
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    fn wav_spec(&self, channels: u16, sample_rate: u32) -> Result<WavSpec> {
        let sample_format = match self.bit_depth {
            16 | 24 => SampleFormat::Int,
            32 => SampleFormat::Float,
            other => {
                return Err(FxError::UnsupportedFormat {
                    format: format!("{}-bit audio (only 16, 24, 32 supported)", other),
                })
            }
        };
        Ok(WavSpec {
            channels,
            sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format,
        })
    }
}

/// Import a WAV file
///
/// # Arguments
/// * `path` - Path to the WAV file to import
///
/// # Errors
/// * `AudioRead` - The file cannot be opened or decoded
/// * `UnsupportedFormat` - Bit depth or channel count the chain cannot take
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    let read_error = |source| FxError::AudioRead {
        path: path.display().to_string(),
        source,
    };

    let reader = WavReader::open(path).map_err(read_error)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    if channels == 0 || channels > MAX_CHANNELS {
        return Err(FxError::UnsupportedFormat {
            format: format!("{}-channel audio (1 to {} supported)", channels, MAX_CHANNELS),
        });
    }

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?
        .map_err(read_error)?;

    debug!(
        "Imported {}: {} Hz, {} channels, {}-bit {:?}",
        path.display(),
        spec.sample_rate,
        channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate)
}

/// Export an AudioBuffer to a WAV file at the buffer's sample rate
///
/// Integer formats are clamped to full scale.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let spec = format.wav_spec(buffer.num_channels() as u16, buffer.sample_rate)?;
    let write_error = |source| FxError::AudioWrite {
        path: path.display().to_string(),
        source,
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_error)?;
    let interleaved = buffer.to_interleaved();

    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(write_error)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(write_error)?;
            }
        }
        _ => {
            for sample in interleaved {
                writer.write_sample(sample).map_err(write_error)?;
            }
        }
    }

    writer.finalize().map_err(write_error)?;
    debug!("Exported {} ({}-bit)", path.display(), format.bit_depth);
    Ok(())
}

/// Generate a sine tone on every channel
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `duration_secs` - Duration of the tone in seconds
/// * `num_channels` - Channels to fill with the same tone
/// * `sample_rate` - Sample rate in Hz
pub fn generate_test_tone(
    frequency: f32,
    duration_secs: f32,
    num_channels: usize,
    sample_rate: u32,
) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(num_channels, num_samples, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    for channel in &mut buffer.samples {
        for (i, sample) in channel.iter_mut().enumerate() {
            *sample = (angular_freq * i as f32).sin();
        }
    }

    buffer
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Read all samples from a WAV reader and convert to f32 in [-1, 1]
///
/// The outer error rejects formats we do not decode; the inner one carries
/// decoding failures.
fn read_samples_as_f32<R: std::io::Read>(
    reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<hound::Result<Vec<f32>>> {
    let samples = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, 32) => reader.into_samples::<f32>().collect(),
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect(),
        (SampleFormat::Int, 24) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect(),
        (SampleFormat::Int, 32) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect(),
        (format, bits) => {
            return Err(FxError::UnsupportedFormat {
                format: format!("{}-bit {:?} audio", bits, format),
            })
        }
    };
    Ok(samples)
}
