//! Panner Effect
//!
//! Constant-power panning with optional LFO modulation of the pan position.
//!
//! - Mono: one pan position splits the signal between the two outputs,
//!   `L *= cos(a)`, `R *= sin(a)` with `a = pi/4 * (pan + 1)`.
//! - Stereo: each input channel has its own pan (and LFO) and is spread
//!   across both outputs:
//!   `outL = inL * cos(aL) + inR * cos(aR)`, `outR = inL * sin(aL) + inR * sin(aR)`.
//!
//! Both variants leave buffers with fewer than two channels untouched.

use crate::dsp::effect::{EffectStage, ProcessSpec};
use crate::dsp::smoothing::SmoothedParameter;
use crate::dsp::StageType;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_stage_common;
use crate::params::descriptors::{
    LEFT_LFO_DEPTH, LEFT_LFO_FREQ, LEFT_PAN, LFO_DEPTH, LFO_ENABLED, LFO_FREQ, PAN,
    PANNER_BYPASS, RIGHT_LFO_DEPTH, RIGHT_LFO_FREQ, RIGHT_PAN,
};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_4, TAU};

const DEFAULT_RAMP_SECONDS: f32 = 0.02;
const MAX_LFO_RATE_HZ: f32 = 20.0;

/// Which panning law the stage applies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PannerMode {
    /// Mono for single-channel input, stereo otherwise; resolved on `prepare`
    #[default]
    Auto,
    Mono,
    Stereo,
}

impl PannerMode {
    /// Parse panner mode from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(PannerMode::Auto),
            "mono" => Some(PannerMode::Mono),
            "stereo" => Some(PannerMode::Stereo),
            _ => None,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            PannerMode::Auto => "auto",
            PannerMode::Mono => "mono",
            PannerMode::Stereo => "stereo",
        }
    }

    /// The concrete variant used for `num_channels` input channels
    pub fn resolve(self, num_channels: usize) -> PannerMode {
        match self {
            PannerMode::Auto if num_channels == 1 => PannerMode::Mono,
            PannerMode::Auto => PannerMode::Stereo,
            mode => mode,
        }
    }
}

/// Constant-power gains for a pan position in `[-1, 1]`
///
/// # Returns
/// `(left, right)` with `left^2 + right^2 == 1`
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = FRAC_PI_4 * (pan.clamp(-1.0, 1.0) + 1.0);
    (angle.cos(), angle.sin())
}

// ============================================================================
// Pan Voice
// ============================================================================

/// Sine LFO phase accumulator
#[derive(Debug, Clone, Default)]
struct Lfo {
    phase: f32,
}

impl Lfo {
    /// Current value, then advance by one sample at `rate_hz`
    #[inline]
    fn next(&mut self, rate_hz: f32, sample_rate: f32) -> f32 {
        let value = self.phase.sin();
        if sample_rate > 0.0 {
            self.phase += TAU * rate_hz / sample_rate;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
        value
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// One pan position with its own LFO
#[derive(Debug, Clone)]
struct PanVoice {
    pan: SmoothedParameter,
    lfo_rate: SmoothedParameter,
    lfo_depth: SmoothedParameter,
    lfo: Lfo,
}

impl PanVoice {
    fn new() -> Self {
        Self {
            pan: SmoothedParameter::new(0.0),
            lfo_rate: SmoothedParameter::new(0.0),
            lfo_depth: SmoothedParameter::new(0.0),
            lfo: Lfo::default(),
        }
    }

    fn prepare(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.pan.reset(sample_rate, ramp_seconds);
        self.lfo_rate.reset(sample_rate, ramp_seconds);
        self.lfo_depth.reset(sample_rate, ramp_seconds);
        self.lfo.reset();
    }

    /// Effective pan for this sample, clamped to `[-1, 1]`
    #[inline]
    fn next_pan(&mut self, lfo_enabled: bool, sample_rate: f32) -> f32 {
        let base = self.pan.advance();
        let rate = self.lfo_rate.advance();
        let depth = self.lfo_depth.advance();
        if lfo_enabled {
            let modulation = self.lfo.next(rate, sample_rate);
            (base + depth * modulation).clamp(-1.0, 1.0)
        } else {
            base
        }
    }
}

// ============================================================================
// Mono / Stereo Panners
// ============================================================================

/// Single pan position applied across the first two channels
#[derive(Debug, Clone)]
pub struct MonoPanner {
    voice: PanVoice,
    lfo_enabled: bool,
    sample_rate: f32,
}

impl MonoPanner {
    pub fn new() -> Self {
        Self {
            voice: PanVoice::new(),
            lfo_enabled: false,
            sample_rate: 0.0,
        }
    }

    fn prepare(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.sample_rate = sample_rate;
        self.voice.prepare(sample_rate, ramp_seconds);
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let sample_rate = self.sample_rate;
        let lfo_enabled = self.lfo_enabled;
        let Some((left, right)) = buffer.stereo_pair_mut() else {
            return;
        };

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (left_gain, right_gain) = pan_gains(self.voice.next_pan(lfo_enabled, sample_rate));
            *l *= left_gain;
            *r *= right_gain;
        }
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            PAN => self.voice.pan.set_target(value.clamp(-1.0, 1.0)),
            LFO_FREQ => self.voice.lfo_rate.set_target(value.clamp(0.0, MAX_LFO_RATE_HZ)),
            LFO_DEPTH => self.voice.lfo_depth.set_target(value.clamp(0.0, 1.0)),
            LFO_ENABLED => self.lfo_enabled = value >= 0.5,
            _ => return false,
        }
        true
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        match name {
            PAN => Some(self.voice.pan.target_value()),
            LFO_FREQ => Some(self.voice.lfo_rate.target_value()),
            LFO_DEPTH => Some(self.voice.lfo_depth.target_value()),
            _ => None,
        }
    }
}

/// Independent pan per input channel, mixed into both outputs
#[derive(Debug, Clone)]
pub struct StereoPanner {
    left: PanVoice,
    right: PanVoice,
    lfo_enabled: bool,
    sample_rate: f32,
}

impl StereoPanner {
    pub fn new() -> Self {
        Self {
            left: PanVoice::new(),
            right: PanVoice::new(),
            lfo_enabled: false,
            sample_rate: 0.0,
        }
    }

    fn prepare(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.sample_rate = sample_rate;
        self.left.prepare(sample_rate, ramp_seconds);
        self.right.prepare(sample_rate, ramp_seconds);
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let sample_rate = self.sample_rate;
        let lfo_enabled = self.lfo_enabled;
        let Some((left, right)) = buffer.stereo_pair_mut() else {
            return;
        };

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (ll, lr) = pan_gains(self.left.next_pan(lfo_enabled, sample_rate));
            let (rl, rr) = pan_gains(self.right.next_pan(lfo_enabled, sample_rate));
            let in_l = *l;
            let in_r = *r;
            *l = in_l * ll + in_r * rl;
            *r = in_l * lr + in_r * rr;
        }
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            LEFT_PAN => self.left.pan.set_target(value.clamp(-1.0, 1.0)),
            RIGHT_PAN => self.right.pan.set_target(value.clamp(-1.0, 1.0)),
            LEFT_LFO_FREQ => self.left.lfo_rate.set_target(value.clamp(0.0, MAX_LFO_RATE_HZ)),
            RIGHT_LFO_FREQ => self.right.lfo_rate.set_target(value.clamp(0.0, MAX_LFO_RATE_HZ)),
            LEFT_LFO_DEPTH => self.left.lfo_depth.set_target(value.clamp(0.0, 1.0)),
            RIGHT_LFO_DEPTH => self.right.lfo_depth.set_target(value.clamp(0.0, 1.0)),
            LFO_ENABLED => self.lfo_enabled = value >= 0.5,
            _ => return false,
        }
        true
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        match name {
            LEFT_PAN => Some(self.left.pan.target_value()),
            RIGHT_PAN => Some(self.right.pan.target_value()),
            LEFT_LFO_FREQ => Some(self.left.lfo_rate.target_value()),
            RIGHT_LFO_FREQ => Some(self.right.lfo_rate.target_value()),
            LEFT_LFO_DEPTH => Some(self.left.lfo_depth.target_value()),
            RIGHT_LFO_DEPTH => Some(self.right.lfo_depth.target_value()),
            _ => None,
        }
    }
}

// ============================================================================
// Panner Engine
// ============================================================================

/// Panner stage holding both variants
///
/// Parameters for either variant are always accepted, so switching the
/// mode keeps every value. Only the active variant processes audio.
#[derive(Debug, Clone)]
pub struct PannerEngine {
    mode: PannerMode,
    /// `mode` resolved against the prepared channel count
    active: PannerMode,
    num_channels: usize,
    mono: MonoPanner,
    stereo: StereoPanner,
    lfo_enabled: bool,
    ramp_seconds: f32,
    bypassed: bool,
}

impl PannerEngine {
    pub fn new(mode: PannerMode) -> Self {
        Self {
            mode,
            active: mode.resolve(0),
            num_channels: 0,
            mono: MonoPanner::new(),
            stereo: StereoPanner::new(),
            lfo_enabled: false,
            ramp_seconds: DEFAULT_RAMP_SECONDS,
            bypassed: false,
        }
    }

    /// Ramp time used by pan and LFO smoothers on `prepare`
    pub fn set_ramp_time(&mut self, seconds: f32) {
        self.ramp_seconds = seconds.max(0.0);
    }

    /// Configured mode, possibly `Auto`
    pub fn mode(&self) -> PannerMode {
        self.mode
    }

    /// Variant that processes audio: never `Auto`
    pub fn active_mode(&self) -> PannerMode {
        self.active
    }

    pub fn set_mode(&mut self, mode: PannerMode) {
        self.mode = mode;
        self.active = mode.resolve(self.num_channels);
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.mono.set_parameter(PAN, pan);
    }

    /// Set the pan of one input channel for the stereo variant
    ///
    /// Channels other than 0 and 1 are ignored.
    pub fn set_channel_pan(&mut self, channel: usize, pan: f32) {
        match channel {
            0 => self.stereo.set_parameter(LEFT_PAN, pan),
            1 => self.stereo.set_parameter(RIGHT_PAN, pan),
            _ => false,
        };
    }

    pub fn set_lfo_enabled(&mut self, enabled: bool) {
        self.lfo_enabled = enabled;
        let value = if enabled { 1.0 } else { 0.0 };
        self.mono.set_parameter(LFO_ENABLED, value);
        self.stereo.set_parameter(LFO_ENABLED, value);
    }

    pub fn lfo_enabled(&self) -> bool {
        self.lfo_enabled
    }
}

impl Default for PannerEngine {
    fn default() -> Self {
        Self::new(PannerMode::default())
    }
}

impl EffectStage for PannerEngine {
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<()> {
        spec.validate()?;
        self.num_channels = spec.num_channels;
        self.active = self.mode.resolve(spec.num_channels);
        self.mono.prepare(spec.sample_rate, self.ramp_seconds);
        self.stereo.prepare(spec.sample_rate, self.ramp_seconds);
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        match self.active {
            PannerMode::Mono => self.mono.process(buffer),
            PannerMode::Stereo | PannerMode::Auto => self.stereo.process(buffer),
        }
    }

    fn reset(&mut self) {
        for voice in [&mut self.mono.voice, &mut self.stereo.left, &mut self.stereo.right] {
            voice.lfo.reset();
        }
    }

    impl_stage_common!(StageType::Panner, "Panner");

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            LFO_ENABLED => {
                self.set_lfo_enabled(value >= 0.5);
                true
            }
            PANNER_BYPASS => {
                self.bypassed = value >= 0.5;
                true
            }
            _ => self.mono.set_parameter(name, value) || self.stereo.set_parameter(name, value),
        }
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        match name {
            LFO_ENABLED => Some(if self.lfo_enabled { 1.0 } else { 0.0 }),
            PANNER_BYPASS => Some(if self.bypassed { 1.0 } else { 0.0 }),
            _ => self
                .mono
                .get_parameter(name)
                .or_else(|| self.stereo.get_parameter(name)),
        }
    }
}
