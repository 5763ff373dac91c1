//! Gain Stage
//!
//! Smoothed dB gain used for the chain's input and output trims.

use crate::dsp::effect::{EffectStage, ProcessSpec};
use crate::dsp::smoothing::SmoothedParameter;
use crate::dsp::StageType;
use crate::engine::buffer::db_to_linear;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::params::descriptors::{INPUT, OUTPUT};

// ============================================================================
// Constants
// ============================================================================

/// Minimum gain in dB
const MIN_GAIN_DB: f32 = -24.0;

/// Maximum gain in dB
const MAX_GAIN_DB: f32 = 24.0;

const DEFAULT_RAMP_SECONDS: f32 = 0.02;

// ============================================================================
// Gain Stage
// ============================================================================

/// Gain stage bound to one named parameter (`input` or `output`)
///
/// The linear gain is smoothed, so a dB change glides over the ramp time
/// rather than stepping.
///
/// # Example
/// ```
/// use multifx::dsp::{EffectStage, GainStage, ProcessSpec};
/// use multifx::engine::AudioBuffer;
///
/// let mut gain = GainStage::input();
/// gain.set_gain_db(-6.0);
/// gain.prepare(&ProcessSpec::new(48000.0, 64, 2)).unwrap();
///
/// let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 64]; 2], 48000).unwrap();
/// gain.process(&mut buffer);
/// assert!((buffer.channel(0)[0] - 0.501).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct GainStage {
    stage_type: StageType,
    parameter: &'static str,
    gain_db: f32,
    gain_linear: SmoothedParameter,
    ramp_seconds: f32,
    bypassed: bool,
}

impl GainStage {
    fn new(stage_type: StageType, parameter: &'static str) -> Self {
        Self {
            stage_type,
            parameter,
            gain_db: 0.0,
            gain_linear: SmoothedParameter::new(1.0),
            ramp_seconds: DEFAULT_RAMP_SECONDS,
            bypassed: false,
        }
    }

    /// Gain stage driven by the `input` parameter
    pub fn input() -> Self {
        Self::new(StageType::InputGain, INPUT)
    }

    /// Gain stage driven by the `output` parameter
    pub fn output() -> Self {
        Self::new(StageType::OutputGain, OUTPUT)
    }

    /// Ramp time used on `prepare`
    pub fn set_ramp_time(&mut self, seconds: f32) {
        self.ramp_seconds = seconds.max(0.0);
    }

    /// Set the gain in decibels
    ///
    /// # Arguments
    /// * `db` - New gain value (-24 to +24 dB), clamped to valid range
    pub fn set_gain_db(&mut self, db: f32) {
        self.gain_db = db.clamp(MIN_GAIN_DB, MAX_GAIN_DB);
        self.gain_linear.set_target(db_to_linear(self.gain_db));
    }

    /// Get the target gain in decibels
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Current linear gain multiplier
    pub fn gain_linear(&self) -> f32 {
        self.gain_linear.current_value()
    }

    /// Name of the parameter this stage answers to
    pub fn parameter_name(&self) -> &'static str {
        self.parameter
    }
}

impl EffectStage for GainStage {
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<()> {
        spec.validate()?;
        self.gain_linear.reset(spec.sample_rate, self.ramp_seconds);
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        // Unity gain optimization
        if !self.gain_linear.is_smoothing()
            && (self.gain_linear.current_value() - 1.0).abs() < f32::EPSILON
        {
            return;
        }

        if !self.gain_linear.is_smoothing() {
            let gain = self.gain_linear.current_value();
            for channel in &mut buffer.samples {
                for sample in channel.iter_mut() {
                    *sample *= gain;
                }
            }
            return;
        }

        for i in 0..buffer.num_samples() {
            let gain = self.gain_linear.advance();
            for channel in &mut buffer.samples {
                channel[i] *= gain;
            }
        }
    }

    fn reset(&mut self) {
        self.gain_linear.skip(usize::MAX);
    }

    fn stage_type(&self) -> StageType {
        self.stage_type
    }

    fn display_name(&self) -> &str {
        self.stage_type.display_name()
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        if name != self.parameter {
            return false;
        }
        self.set_gain_db(value);
        true
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        (name == self.parameter).then_some(self.gain_db)
    }

    fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }
}
