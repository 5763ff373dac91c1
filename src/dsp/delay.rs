//! Delay Effect
//!
//! Per-channel delay with feedback, dry/wet mix and a ping-pong mode where
//! each side's echo is fed into the opposite side's delay line.

use crate::dsp::effect::{EffectStage, ProcessSpec};
use crate::dsp::ring_buffer::RingBuffer;
use crate::dsp::smoothing::SmoothedParameter;
use crate::dsp::StageType;
use crate::engine::AudioBuffer;
use crate::error::{FxError, Result};
use crate::impl_stage_common;
use crate::params::descriptors::{
    DELAY_BYPASS, DELAY_MIX, DELAY_TIME_LEFT, DELAY_TIME_RIGHT, DELAY_TYPE, FEEDBACK,
};
use log::debug;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Default longest delay in milliseconds
pub const DEFAULT_MAX_DELAY_MS: f32 = 2000.0;

/// Threshold for flushing denormal numbers to zero
const DENORMAL_THRESHOLD: f32 = 1e-15;

const DEFAULT_RAMP_SECONDS: f32 = 0.02;

#[inline]
fn flush_denormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        x
    }
}

// ============================================================================
// Delay Type
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DelayType {
    /// Each channel feeds back into itself
    #[default]
    SingleTap,
    /// Channels 0 and 1 feed back into each other
    PingPong,
}

impl DelayType {
    pub fn from_index(index: f32) -> Self {
        if index >= 0.5 {
            DelayType::PingPong
        } else {
            DelayType::SingleTap
        }
    }

    pub fn index(&self) -> f32 {
        match self {
            DelayType::SingleTap => 0.0,
            DelayType::PingPong => 1.0,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DelayType::SingleTap => "Single Tap",
            DelayType::PingPong => "Ping Pong",
        }
    }
}

// ============================================================================
// Delay Line
// ============================================================================

/// Multi-channel delay line
///
/// # Parameters
/// - `delayTimeLeft` / `delayTimeRight`: per-channel delay, 0 to the prepared maximum (ms)
/// - `feedback`: amount of the echo written back into the line (0.0 to 1.0)
/// - `delayMix`: dry/wet mix (0.0 = dry, 1.0 = wet)
/// - `delaytype`: 0 = single tap, 1 = ping-pong
///
/// Channels beyond the second take their delay time from `delayTimeRight`
/// and always run single tap.
///
/// # Algorithm
/// For each sample and channel, with `D = round(ms * fs / 1000)`:
/// - `delayed` is the input from `D` samples ago (the input itself when `D == 0`)
/// - the line is written with `in + source * feedback`, where `source` is this
///   channel's echo, or the partner channel's echo in ping-pong mode
/// - `out = (1 - mix) * in + mix * delayed`
#[derive(Debug, Clone)]
pub struct DelayLine {
    ring: RingBuffer,
    delay_times: Vec<SmoothedParameter>,
    feedback: SmoothedParameter,
    mix: SmoothedParameter,
    delay_type: DelayType,
    max_delay_ms: f32,
    sample_rate: f32,
    ramp_seconds: f32,
    /// Current delay per channel in samples
    delay_samples: Vec<usize>,
    /// Echo read this frame per channel
    taps: Vec<f32>,
    /// Echo available for feedback this frame (0 for zero-delay channels)
    returns: Vec<f32>,
    bypassed: bool,
}

impl DelayLine {
    /// Create a delay line with the default 2 s maximum
    pub fn new() -> Self {
        Self::with_max_delay(DEFAULT_MAX_DELAY_MS)
    }

    /// Create a delay line holding up to `max_delay_ms` of history once prepared
    pub fn with_max_delay(max_delay_ms: f32) -> Self {
        Self {
            ring: RingBuffer::new(),
            delay_times: vec![SmoothedParameter::new(0.0); 2],
            feedback: SmoothedParameter::new(0.0),
            mix: SmoothedParameter::new(0.0),
            delay_type: DelayType::SingleTap,
            max_delay_ms: max_delay_ms.max(0.0),
            sample_rate: 0.0,
            ramp_seconds: DEFAULT_RAMP_SECONDS,
            delay_samples: Vec::new(),
            taps: Vec::new(),
            returns: Vec::new(),
            bypassed: false,
        }
    }

    /// Ramp time used by every smoother on `prepare`
    pub fn set_ramp_time(&mut self, seconds: f32) {
        self.ramp_seconds = seconds.max(0.0);
    }

    /// Change the longest supported delay; takes effect on the next `prepare`
    pub fn set_max_delay(&mut self, max_delay_ms: f32) {
        self.max_delay_ms = max_delay_ms.max(0.0);
    }

    /// Set feedback (clamped to 0..1)
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback.set_target(feedback.clamp(0.0, 1.0));
    }

    /// Set dry/wet mix (clamped to 0..1)
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(mix.clamp(0.0, 1.0));
    }

    /// Set one channel's delay time, clamped to the maximum delay
    ///
    /// Channels that do not exist yet are ignored.
    pub fn set_channel_delay_time(&mut self, channel: usize, ms: f32) {
        let ms = ms.clamp(0.0, self.max_delay_ms);
        if let Some(param) = self.delay_times.get_mut(channel) {
            param.set_target(ms);
        }
        // Extra channels follow the right channel
        if channel == 1 {
            for param in self.delay_times.iter_mut().skip(2) {
                param.set_target(ms);
            }
        }
    }

    pub fn set_delay_type(&mut self, delay_type: DelayType) {
        self.delay_type = delay_type;
    }

    pub fn delay_type(&self) -> DelayType {
        self.delay_type
    }

    pub fn feedback(&self) -> f32 {
        self.feedback.target_value()
    }

    pub fn mix(&self) -> f32 {
        self.mix.target_value()
    }

    /// Target delay time for a channel in ms
    pub fn channel_delay_time(&self, channel: usize) -> Option<f32> {
        self.delay_times.get(channel).map(|p| p.target_value())
    }

    /// Longest supported delay in ms
    pub fn max_delay_ms(&self) -> f32 {
        self.max_delay_ms
    }

    /// Delay applied to the last processed sample of a channel
    pub fn delay_samples(&self, channel: usize) -> Option<usize> {
        self.delay_samples.get(channel).copied()
    }

    /// Convert a delay time to whole samples, within the ring's reach
    #[inline]
    fn samples_for(&self, ms: f32) -> usize {
        let samples = (ms * self.sample_rate / 1000.0).round().max(0.0) as usize;
        samples.min(self.ring.capacity().saturating_sub(1))
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectStage for DelayLine {
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<()> {
        spec.validate()?;
        if !self.max_delay_ms.is_finite() || self.max_delay_ms <= 0.0 {
            return Err(FxError::InvalidMaxDelay {
                max_delay_ms: self.max_delay_ms,
            });
        }

        // One extra sample so the full maximum is reachable behind the write cursor
        let max_seconds = self.max_delay_ms / 1000.0 + 1.0 / spec.sample_rate;
        self.ring.prepare(
            spec.sample_rate,
            spec.max_block_size,
            spec.num_channels,
            max_seconds,
        )?;
        self.sample_rate = spec.sample_rate;

        let right = self.delay_times[1].target_value();
        let channels = spec.num_channels.max(2);
        self.delay_times
            .resize_with(channels, || SmoothedParameter::new(right));
        for param in &mut self.delay_times {
            param.reset(spec.sample_rate, self.ramp_seconds);
        }
        self.feedback.reset(spec.sample_rate, self.ramp_seconds);
        self.mix.reset(spec.sample_rate, self.ramp_seconds);

        self.delay_samples = vec![0; spec.num_channels];
        self.taps = vec![0.0; spec.num_channels];
        self.returns = vec![0.0; spec.num_channels];

        debug!(
            "Delay prepared: {} channels, {} samples per channel",
            spec.num_channels,
            self.ring.capacity()
        );
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let channels = buffer.num_channels().min(self.ring.num_channels());
        let num_samples = buffer.num_samples();
        let ping_pong = self.delay_type == DelayType::PingPong && channels >= 2;

        for i in 0..num_samples {
            let feedback = self.feedback.advance();
            let mix = self.mix.advance();

            // Read every channel's echo before any channel writes
            for ch in 0..channels {
                let ms = self.delay_times[ch].advance();
                let delay = self.samples_for(ms);
                self.delay_samples[ch] = delay;
                if delay == 0 {
                    self.taps[ch] = buffer.samples[ch][i];
                    self.returns[ch] = 0.0;
                } else {
                    let delayed = self.ring.read_at(ch, delay - 1);
                    self.taps[ch] = delayed;
                    self.returns[ch] = delayed;
                }
            }

            for ch in 0..channels {
                let input = buffer.samples[ch][i];
                let source = if ping_pong && ch < 2 {
                    self.returns[1 - ch]
                } else {
                    self.returns[ch]
                };
                let write = if self.delay_samples[ch] == 0 {
                    input
                } else {
                    flush_denormal(input + source * feedback)
                };
                self.ring.write_and_advance(ch, write);

                buffer.samples[ch][i] = (1.0 - mix) * input + mix * self.taps[ch];
            }
        }
    }

    fn reset(&mut self) {
        self.ring.clear();
        self.taps.fill(0.0);
        self.returns.fill(0.0);
    }

    impl_stage_common!(StageType::Delay, "Delay");

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            DELAY_TIME_LEFT => self.set_channel_delay_time(0, value),
            DELAY_TIME_RIGHT => self.set_channel_delay_time(1, value),
            FEEDBACK => self.set_feedback(value),
            DELAY_MIX => self.set_mix(value),
            DELAY_TYPE => self.delay_type = DelayType::from_index(value),
            DELAY_BYPASS => self.bypassed = value >= 0.5,
            _ => return false,
        }
        true
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        match name {
            DELAY_TIME_LEFT => self.channel_delay_time(0),
            DELAY_TIME_RIGHT => self.channel_delay_time(1),
            FEEDBACK => Some(self.feedback()),
            DELAY_MIX => Some(self.mix()),
            DELAY_TYPE => Some(self.delay_type.index()),
            DELAY_BYPASS => Some(if self.bypassed { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}
