//! Effect stage trait definition
//!
//! Uniform interface the chain uses to drive every processing stage.

use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};

/// Largest channel count a chain can be prepared with
pub const MAX_CHANNELS: usize = 8;

/// Processing configuration handed to every stage on `prepare`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Largest block `process` will be called with
    pub max_block_size: usize,
    /// Number of channels in each block
    pub num_channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f32, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_channels,
        }
    }

    /// Reject configurations no stage can run with
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(FxError::InvalidSampleRate {
                sample_rate: self.sample_rate,
            });
        }
        if self.max_block_size == 0 {
            return Err(FxError::InvalidBlockSize {
                block_size: self.max_block_size,
            });
        }
        if self.num_channels == 0 || self.num_channels > MAX_CHANNELS {
            return Err(FxError::InvalidChannelCount {
                channels: self.num_channels,
            });
        }
        Ok(())
    }
}

/// Identifies a stage's position and role in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    InputGain,
    Distortion,
    Delay,
    Panner,
    Equalizer,
    OutputGain,
}

impl StageType {
    /// All stages in processing order
    pub const ALL: [StageType; 6] = [
        StageType::InputGain,
        StageType::Distortion,
        StageType::Delay,
        StageType::Panner,
        StageType::Equalizer,
        StageType::OutputGain,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StageType::InputGain => "input_gain",
            StageType::Distortion => "distortion",
            StageType::Delay => "delay",
            StageType::Panner => "panner",
            StageType::Equalizer => "equalizer",
            StageType::OutputGain => "output_gain",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            StageType::InputGain => "Input Gain",
            StageType::Distortion => "Distortion",
            StageType::Delay => "Delay",
            StageType::Panner => "Panner",
            StageType::Equalizer => "Equalizer",
            StageType::OutputGain => "Output Gain",
        }
    }
}

/// Base trait for all processing stages
///
/// Stages process audio buffers in place. `prepare` may allocate and is
/// the only method allowed to fail; everything else runs on the audio
/// thread and must neither block nor allocate.
pub trait EffectStage: Send {
    /// Allocate state for the given configuration
    ///
    /// Called while no `process` call is in flight.
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<()>;

    /// Process audio buffer in-place
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Clear filter and delay history without reallocating
    fn reset(&mut self);

    /// Get the stage type identifier
    fn stage_type(&self) -> StageType;

    /// Get human-readable display name
    fn display_name(&self) -> &str;

    /// Set a named parameter
    ///
    /// Returns false when the name does not belong to this stage.
    fn set_parameter(&mut self, name: &str, value: f32) -> bool;

    /// Read back a named parameter target, or `None` if unknown
    fn get_parameter(&self, name: &str) -> Option<f32>;

    /// Check if the stage is bypassed
    fn is_bypassed(&self) -> bool;

    /// Bypass or re-engage the stage
    fn set_bypassed(&mut self, bypassed: bool);
}

/// Helper macro to implement common EffectStage trait methods
#[macro_export]
macro_rules! impl_stage_common {
    ($stage_type:expr, $display_name:expr) => {
        fn stage_type(&self) -> $crate::dsp::StageType {
            $stage_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn is_bypassed(&self) -> bool {
            self.bypassed
        }

        fn set_bypassed(&mut self, bypassed: bool) {
            self.bypassed = bypassed;
        }
    };
}
