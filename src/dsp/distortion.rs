//! Distortion Effect
//!
//! Switchable waveshaper (hard clip, soft clip, asymmetric saturation) with
//! drive, dry/wet mix and output trim. Each channel passes through a 10 Hz
//! DC blocker before shaping so that offsets from earlier stages do not
//! bias the clipping point.

use crate::dsp::effect::{EffectStage, ProcessSpec};
use crate::dsp::smoothing::SmoothedParameter;
use crate::dsp::StageType;
use crate::engine::buffer::db_to_linear;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_stage_common;
use crate::params::descriptors::{
    DISTORTION_BYPASS, DISTORTION_OUTPUT, DISTORTION_TYPE, DRIVE, MIX,
};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_2_PI, PI};

// ============================================================================
// Constants
// ============================================================================

/// Maximum drive in dB
const MAX_DRIVE_DB: f32 = 24.0;

/// Saturation maps the full drive range onto this many dB
const SATURATION_MAX_DRIVE_DB: f32 = 6.0;

const MIN_OUTPUT_DB: f32 = -24.0;
const MAX_OUTPUT_DB: f32 = 24.0;

/// Hard clip ceiling
const CLIP_LEVEL: f32 = 0.99;

/// DC blocker corner frequency in Hz
const DC_BLOCKER_CUTOFF_HZ: f32 = 10.0;

const DEFAULT_RAMP_SECONDS: f32 = 0.02;

// ============================================================================
// Distortion Type
// ============================================================================

/// Transfer function applied by the distortion stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistortionType {
    /// `clamp(x * g, -0.99, 0.99)`
    #[default]
    HardClip,
    /// `(2 / pi) * atan(x * g)`
    SoftClip,
    /// Asymmetric tanh/sinh curve with a narrower drive range
    Saturation,
}

impl DistortionType {
    /// Map a host choice index to a type; unknown indices yield `None`
    pub fn from_index(index: f32) -> Option<Self> {
        match index.round() as i32 {
            0 => Some(DistortionType::HardClip),
            1 => Some(DistortionType::SoftClip),
            2 => Some(DistortionType::Saturation),
            _ => None,
        }
    }

    pub fn index(&self) -> f32 {
        match self {
            DistortionType::HardClip => 0.0,
            DistortionType::SoftClip => 1.0,
            DistortionType::Saturation => 2.0,
        }
    }

    /// Parse distortion type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hard" | "hardclip" | "hard_clip" => Some(DistortionType::HardClip),
            "soft" | "softclip" | "soft_clip" => Some(DistortionType::SoftClip),
            "saturation" => Some(DistortionType::Saturation),
            _ => None,
        }
    }

    /// Get string identifier
    pub fn to_str(&self) -> &'static str {
        match self {
            DistortionType::HardClip => "hard_clip",
            DistortionType::SoftClip => "soft_clip",
            DistortionType::Saturation => "saturation",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DistortionType::HardClip => "Hard Clip",
            DistortionType::SoftClip => "Soft Clip",
            DistortionType::Saturation => "Saturation",
        }
    }
}

// ============================================================================
// Waveshaping Functions
// ============================================================================

#[inline]
fn waveshape_hard_clip(x: f32, gain: f32) -> f32 {
    (x * gain).clamp(-CLIP_LEVEL, CLIP_LEVEL)
}

#[inline]
fn waveshape_soft_clip(x: f32, gain: f32) -> f32 {
    FRAC_2_PI * (x * gain).atan()
}

/// Positive half: tanh. Negative half: tanh(sinh(v)) minus a sine ripple,
/// which gives the curve its asymmetry.
#[inline]
fn waveshape_saturation(x: f32, gain: f32) -> f32 {
    let driven = x * gain;
    if x >= 0.0 {
        driven.tanh()
    } else {
        driven.sinh().tanh() - 0.2 * driven * (PI * driven).sin()
    }
}

/// Drive in dB as seen by the saturation curve
#[inline]
fn saturation_drive_db(drive_db: f32) -> f32 {
    drive_db * (SATURATION_MAX_DRIVE_DB / MAX_DRIVE_DB)
}

#[inline]
fn shape(shaper: DistortionType, x: f32, drive_gain: f32, saturation_gain: f32) -> f32 {
    match shaper {
        DistortionType::HardClip => waveshape_hard_clip(x, drive_gain),
        DistortionType::SoftClip => waveshape_soft_clip(x, drive_gain),
        DistortionType::Saturation => waveshape_saturation(x, saturation_gain),
    }
}

// ============================================================================
// DC Blocker
// ============================================================================

/// One-pole high-pass: `y[n] = x[n] - x[n-1] + r * y[n-1]`
#[derive(Debug, Clone, Copy, Default)]
struct DcBlocker {
    x1: f32,
    y1: f32,
}

impl DcBlocker {
    #[inline]
    fn process(&mut self, input: f32, r: f32) -> f32 {
        let output = input - self.x1 + r * self.y1;
        self.x1 = input;
        self.y1 = output;
        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

// ============================================================================
// Distortion Engine
// ============================================================================

/// Per-sample gains derived from the smoothed dB parameters
#[derive(Debug, Clone, Copy)]
struct Gains {
    drive: f32,
    saturation: f32,
    mix: f32,
    output: f32,
}

/// Distortion stage
///
/// # Parameters
/// - `drive`: pre-shaper gain, 0 to 24 dB
/// - `mix`: dry/wet mix (0.0 = dry, 1.0 = wet)
/// - `distortionOutput`: output trim, -24 to +24 dB
/// - `distortiontype`: 0 = hard clip, 1 = soft clip, 2 = saturation
///
/// An unrecognised type index turns the shaper into a pass-through
/// (`wet = x`) until a valid type is set.
#[derive(Debug, Clone)]
pub struct DistortionEngine {
    drive: SmoothedParameter,
    mix: SmoothedParameter,
    output: SmoothedParameter,
    shaper: Option<DistortionType>,
    dc_blockers: Vec<DcBlocker>,
    dc_coeff: f32,
    cached: Gains,
    ramp_seconds: f32,
    bypassed: bool,
}

impl DistortionEngine {
    /// Create a hard-clip distortion at 0 dB drive, fully dry
    pub fn new() -> Self {
        let mut engine = Self {
            drive: SmoothedParameter::new(0.0),
            mix: SmoothedParameter::new(0.0),
            output: SmoothedParameter::new(0.0),
            shaper: Some(DistortionType::HardClip),
            dc_blockers: Vec::new(),
            dc_coeff: 0.0,
            cached: Gains {
                drive: 1.0,
                saturation: 1.0,
                mix: 0.0,
                output: 1.0,
            },
            ramp_seconds: DEFAULT_RAMP_SECONDS,
            bypassed: false,
        };
        engine.refresh_gains();
        engine
    }

    /// Ramp time used by the drive, mix and output smoothers on `prepare`
    pub fn set_ramp_time(&mut self, seconds: f32) {
        self.ramp_seconds = seconds.max(0.0);
    }

    /// Set drive in dB (clamped to 0..24)
    pub fn set_drive(&mut self, db: f32) {
        self.drive.set_target(db.clamp(0.0, MAX_DRIVE_DB));
        self.refresh_gains();
    }

    /// Set dry/wet mix (clamped to 0..1)
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(mix.clamp(0.0, 1.0));
        self.refresh_gains();
    }

    /// Set output trim in dB (clamped to -24..24)
    pub fn set_output(&mut self, db: f32) {
        self.output.set_target(db.clamp(MIN_OUTPUT_DB, MAX_OUTPUT_DB));
        self.refresh_gains();
    }

    /// Switch transfer function; applies from the next sample
    pub fn set_type(&mut self, distortion_type: DistortionType) {
        self.shaper = Some(distortion_type);
    }

    /// Current transfer function, `None` while passing through
    pub fn distortion_type(&self) -> Option<DistortionType> {
        self.shaper
    }

    pub fn drive(&self) -> f32 {
        self.drive.target_value()
    }

    pub fn mix(&self) -> f32 {
        self.mix.target_value()
    }

    pub fn output(&self) -> f32 {
        self.output.target_value()
    }

    /// Shape one sample, advancing every smoother by one step
    ///
    /// Stateless apart from parameter smoothing: the DC blocker only runs
    /// inside [`EffectStage::process`], where per-channel history exists.
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        let gains = self.next_gains();
        self.render(x, x, gains)
    }

    /// Advance the smoothers and return this sample's gains
    #[inline]
    fn next_gains(&mut self) -> Gains {
        if self.drive.is_smoothing() || self.mix.is_smoothing() || self.output.is_smoothing() {
            self.drive.advance();
            self.mix.advance();
            self.output.advance();
            self.refresh_gains();
        }
        self.cached
    }

    fn refresh_gains(&mut self) {
        let drive_db = self.drive.current_value();
        self.cached = Gains {
            drive: db_to_linear(drive_db),
            saturation: db_to_linear(saturation_drive_db(drive_db)),
            mix: self.mix.current_value(),
            output: db_to_linear(self.output.current_value()),
        };
    }

    /// `(mix * wet + (1 - mix) * dry) * output`
    #[inline]
    fn render(&self, dry: f32, shaped_input: f32, gains: Gains) -> f32 {
        let wet = match self.shaper {
            Some(shaper) => shape(shaper, shaped_input, gains.drive, gains.saturation),
            None => shaped_input,
        };
        (gains.mix * wet + (1.0 - gains.mix) * dry) * gains.output
    }

    /// True when the stage would leave the signal untouched
    fn is_transparent(&self) -> bool {
        !self.mix.is_smoothing()
            && !self.output.is_smoothing()
            && self.mix.current_value() == 0.0
            && self.output.current_value() == 0.0
    }
}

impl Default for DistortionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectStage for DistortionEngine {
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<()> {
        spec.validate()?;
        self.drive.reset(spec.sample_rate, self.ramp_seconds);
        self.mix.reset(spec.sample_rate, self.ramp_seconds);
        self.output.reset(spec.sample_rate, self.ramp_seconds);
        self.refresh_gains();

        self.dc_coeff = (-2.0 * PI * DC_BLOCKER_CUTOFF_HZ / spec.sample_rate).exp();
        self.dc_blockers = vec![DcBlocker::default(); spec.num_channels];
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let num_samples = buffer.num_samples();
        let dc_coeff = self.dc_coeff;

        if self.is_transparent() {
            // Keep the blockers tracking the input so wet output resumes settled
            for (channel, blocker) in buffer.samples.iter().zip(self.dc_blockers.iter_mut()) {
                for &sample in &channel[..num_samples] {
                    blocker.process(sample, dc_coeff);
                }
            }
            return;
        }

        for i in 0..num_samples {
            let gains = self.next_gains();
            for (ch, channel) in buffer.samples.iter_mut().enumerate() {
                let dry = channel[i];
                let filtered = match self.dc_blockers.get_mut(ch) {
                    Some(blocker) => blocker.process(dry, dc_coeff),
                    None => dry,
                };
                channel[i] = self.render(dry, filtered, gains);
            }
        }
    }

    fn reset(&mut self) {
        for blocker in &mut self.dc_blockers {
            blocker.reset();
        }
        self.drive.skip(usize::MAX);
        self.mix.skip(usize::MAX);
        self.output.skip(usize::MAX);
        self.refresh_gains();
    }

    impl_stage_common!(StageType::Distortion, "Distortion");

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        match name {
            DRIVE => self.set_drive(value),
            MIX => self.set_mix(value),
            DISTORTION_OUTPUT => self.set_output(value),
            DISTORTION_TYPE => self.shaper = DistortionType::from_index(value),
            DISTORTION_BYPASS => self.bypassed = value >= 0.5,
            _ => return false,
        }
        true
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        match name {
            DRIVE => Some(self.drive()),
            MIX => Some(self.mix()),
            DISTORTION_OUTPUT => Some(self.output()),
            DISTORTION_TYPE => Some(self.shaper.map(|t| t.index()).unwrap_or(-1.0)),
            DISTORTION_BYPASS => Some(if self.bypassed { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    fn engine(shaper: DistortionType, drive: f32, mix: f32, output: f32) -> DistortionEngine {
        let mut engine = DistortionEngine::new();
        engine.set_type(shaper);
        engine.set_drive(drive);
        engine.set_mix(mix);
        engine.set_output(output);
        engine.prepare(&ProcessSpec::new(48000.0, 512, 2)).unwrap();
        engine
    }

    #[test_case(DistortionType::HardClip ; "hard clip")]
    #[test_case(DistortionType::SoftClip ; "soft clip")]
    #[test_case(DistortionType::Saturation ; "saturation")]
    fn test_output_is_finite(shaper: DistortionType) {
        for &drive in &[0.0, 6.0, 12.0, 24.0] {
            for &mix in &[0.0, 0.5, 1.0] {
                for &output in &[-24.0, 0.0, 24.0] {
                    let mut engine = engine(shaper, drive, mix, output);
                    let mut x = -10.0;
                    while x <= 10.0 {
                        let y = engine.process_sample(x);
                        assert!(y.is_finite(), "{shaper:?} drive={drive} x={x} -> {y}");
                        x += 0.25;
                    }
                }
            }
        }
    }

    #[test_case(0.0 ; "unity output")]
    #[test_case(-6.0 ; "attenuated output")]
    #[test_case(12.0 ; "boosted output")]
    fn test_hard_clip_bound(output_db: f32) {
        let mut engine = engine(DistortionType::HardClip, 24.0, 1.0, output_db);
        let limit = CLIP_LEVEL * db_to_linear(output_db) + 1e-5;
        for &x in &[0.1, 0.5, 1.0, 5.0, -0.1, -0.5, -1.0, -5.0] {
            let y = engine.process_sample(x);
            assert!(y.abs() <= limit, "x={x} y={y} limit={limit}");
        }
    }

    #[test]
    fn test_soft_clip_is_odd() {
        let mut engine = engine(DistortionType::SoftClip, 12.0, 0.7, 3.0);
        for &x in &[0.01, 0.2, 0.8, 2.0, 9.0] {
            let pos = engine.process_sample(x);
            let neg = engine.process_sample(-x);
            assert_abs_diff_eq!(neg, -pos, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_saturation_is_asymmetric() {
        let mut engine = engine(DistortionType::Saturation, 24.0, 1.0, 0.0);
        let pos = engine.process_sample(0.4);
        let neg = engine.process_sample(-0.4);
        assert!((pos + neg).abs() > 1e-3);
    }

    #[test]
    fn test_saturation_drive_is_narrowed() {
        assert_abs_diff_eq!(saturation_drive_db(24.0), 6.0, epsilon = 1e-6);
        assert_abs_diff_eq!(saturation_drive_db(12.0), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dry_mix_is_passthrough() {
        let mut engine = engine(DistortionType::HardClip, 24.0, 0.0, 0.0);
        let mut buffer = AudioBuffer::from_channels(vec![vec![0.3, -0.7, 1.5]; 2], 48000).unwrap();
        let original = buffer.clone();
        engine.process(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let mut engine = engine(DistortionType::HardClip, 24.0, 1.0, 0.0);
        assert!(engine.set_parameter(DISTORTION_TYPE, 7.0));
        assert_eq!(engine.distortion_type(), None);
        assert_abs_diff_eq!(engine.process_sample(0.5), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_type_switch_takes_effect_next_sample() {
        let mut engine = engine(DistortionType::HardClip, 0.0, 1.0, 0.0);
        assert_abs_diff_eq!(engine.process_sample(2.0), 0.99, epsilon = 1e-6);
        engine.set_type(DistortionType::SoftClip);
        assert_abs_diff_eq!(engine.process_sample(1.0), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_dc_blocker_removes_offset() {
        let mut engine = engine(DistortionType::SoftClip, 0.0, 1.0, 0.0);
        let mut buffer = AudioBuffer::from_channels(vec![vec![0.5; 48000]; 2], 48000).unwrap();
        engine.process(&mut buffer);
        // After one second a 10 Hz high-pass has long since settled
        assert!(buffer.channel(0)[47999].abs() < 1e-3);
        assert!(buffer.channel(1)[47999].abs() < 1e-3);
    }

    #[test]
    fn test_dc_blocker_tracks_input_while_dry() {
        let spec = ProcessSpec::new(48000.0, 4800, 1);
        let make = |mix: f32| {
            let mut engine = DistortionEngine::new();
            engine.set_ramp_time(0.0);
            engine.set_type(DistortionType::SoftClip);
            engine.set_mix(mix);
            engine.prepare(&spec).unwrap();
            engine
        };
        let block = || AudioBuffer::from_channels(vec![vec![0.5; 4800]], 48000).unwrap();

        let mut switched = make(0.0);
        let mut always_wet = make(1.0);

        let mut first = block();
        switched.process(&mut first);
        assert_eq!(first, block());
        always_wet.process(&mut block());

        switched.set_mix(1.0);
        let mut a = block();
        let mut b = block();
        switched.process(&mut a);
        always_wet.process(&mut b);
        for (x, y) in a.channel(0).iter().zip(b.channel(0)) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_parameter_names() {
        let mut engine = DistortionEngine::new();
        assert!(engine.set_parameter(DRIVE, 40.0));
        assert_eq!(engine.get_parameter(DRIVE), Some(24.0));
        assert!(engine.set_parameter(MIX, 0.5));
        assert_eq!(engine.get_parameter(MIX), Some(0.5));
        assert!(engine.set_parameter(DISTORTION_BYPASS, 1.0));
        assert!(engine.is_bypassed());
        assert!(!engine.set_parameter("feedback", 0.5));
        assert_eq!(engine.get_parameter("feedback"), None);
    }

    #[test]
    fn test_mix_ramps_without_steps() {
        let mut engine = engine(DistortionType::HardClip, 24.0, 0.0, 0.0);
        engine.set_mix(1.0);
        let mut previous = engine.process_sample(0.1);
        for _ in 0..960 {
            let y = engine.process_sample(0.1);
            assert!((y - previous).abs() < 0.01);
            previous = y;
        }
        assert_abs_diff_eq!(previous, 0.99, epsilon = 1e-5);
    }
}
