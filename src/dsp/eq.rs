//! Parametric EQ Effect
//!
//! Four cascaded biquad bands (low shelf, two peaking, high shelf by
//! default). Frequency, gain and Q are smoothed; while any of them is
//! moving, coefficients are recomputed every [`COEFF_UPDATE_INTERVAL`]
//! samples, otherwise only when a band is marked dirty.

use crate::dsp::effect::{EffectStage, ProcessSpec};
use crate::dsp::smoothing::SmoothedParameter;
use crate::dsp::StageType;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::impl_stage_common;
use crate::params::descriptors::EQ_BYPASS;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ============================================================================
// Constants
// ============================================================================

/// Number of EQ bands
pub const NUM_BANDS: usize = 4;

/// Samples between coefficient updates while a band is gliding
pub const COEFF_UPDATE_INTERVAL: usize = 32;

const MIN_FREQUENCY: f32 = 20.0;
const MAX_FREQUENCY_RATIO: f32 = 0.49;
const MIN_GAIN_DB: f32 = -24.0;
const MAX_GAIN_DB: f32 = 24.0;
const MIN_Q: f32 = 0.1;
const MAX_Q: f32 = 20.0;
const DEFAULT_Q: f32 = 0.707;

/// Gains closer to 0 dB than this are treated as flat
const BYPASS_GAIN_DB: f32 = 0.01;

const DENORMAL_THRESHOLD: f64 = 1e-15;

const DEFAULT_RAMP_SECONDS: f32 = 0.01;

const DEFAULT_FREQUENCIES: [f32; NUM_BANDS] = [100.0, 500.0, 2000.0, 8000.0];
const DEFAULT_TYPES: [BandType; NUM_BANDS] = [
    BandType::LowShelf,
    BandType::Peaking,
    BandType::Peaking,
    BandType::HighShelf,
];

/// Filter shape for an EQ band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandType {
    /// Boost/cut below frequency
    LowShelf,
    /// Bell curve boost/cut
    #[default]
    Peaking,
    /// Boost/cut above frequency
    HighShelf,
}

impl BandType {
    /// Map a host choice index to a band type (clamped to the valid range)
    pub fn from_index(index: f32) -> Self {
        match index.round() as i32 {
            i32::MIN..=0 => BandType::LowShelf,
            1 => BandType::Peaking,
            _ => BandType::HighShelf,
        }
    }

    pub fn index(&self) -> f32 {
        match self {
            BandType::LowShelf => 0.0,
            BandType::Peaking => 1.0,
            BandType::HighShelf => 2.0,
        }
    }
}

/// Band parameter addressed by `set_band_parameter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandParameter {
    Frequency,
    Gain,
    Q,
    Enabled,
    Type,
}

impl BandParameter {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "frequency" => Some(BandParameter::Frequency),
            "gain" => Some(BandParameter::Gain),
            "q" => Some(BandParameter::Q),
            "enabled" => Some(BandParameter::Enabled),
            "type" => Some(BandParameter::Type),
            _ => None,
        }
    }
}

/// Split `band{i}_{param}` into its index and parameter without allocating
pub fn parse_band_name(name: &str) -> Option<(usize, BandParameter)> {
    let rest = name.strip_prefix("band")?;
    let (index, suffix) = rest.split_once('_')?;
    let index: usize = index.parse().ok()?;
    if index >= NUM_BANDS {
        return None;
    }
    Some((index, BandParameter::from_suffix(suffix)?))
}

// ============================================================================
// Biquad
// ============================================================================

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoeffs {
    const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Calculate biquad coefficients using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    fn calculate(band_type: BandType, sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match band_type {
            BandType::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            BandType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            BandType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Magnitude response in dB at `frequency`
    fn magnitude_db(&self, sample_rate: f64, frequency: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        20.0 * (num / den).log10()
    }
}

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl BiquadState {
    /// Direct Form I
    #[inline]
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let mut output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;
        if output.abs() < DENORMAL_THRESHOLD {
            output = 0.0;
        }

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// EQ Band
// ============================================================================

/// One band: smoothed settings, cached coefficients, per-channel history
#[derive(Debug, Clone)]
struct EqBand {
    frequency: SmoothedParameter,
    /// Last frequency set by the host, before the Nyquist clamp
    requested_frequency: f32,
    gain_db: SmoothedParameter,
    q: SmoothedParameter,
    band_type: BandType,
    enabled: bool,
    coeffs: BiquadCoeffs,
    /// Flat response: skipped like a disabled band
    flat: bool,
    dirty: bool,
    states: Vec<BiquadState>,
}

impl EqBand {
    fn new(frequency: f32, band_type: BandType) -> Self {
        Self {
            frequency: SmoothedParameter::new(frequency),
            requested_frequency: frequency,
            gain_db: SmoothedParameter::new(0.0),
            q: SmoothedParameter::new(DEFAULT_Q),
            band_type,
            enabled: true,
            coeffs: BiquadCoeffs::IDENTITY,
            flat: true,
            dirty: true,
            states: Vec::new(),
        }
    }

    #[inline]
    fn is_smoothing(&self) -> bool {
        self.frequency.is_smoothing() || self.gain_db.is_smoothing() || self.q.is_smoothing()
    }

    /// Requested frequency limited to what `sample_rate` can represent
    fn effective_frequency(&self, sample_rate: f32) -> f32 {
        let max = if sample_rate > 0.0 {
            MAX_FREQUENCY_RATIO * sample_rate
        } else {
            f32::MAX
        };
        self.requested_frequency.clamp(MIN_FREQUENCY, max)
    }

    /// Advance the smoothers by `num_samples` and refresh the coefficients
    fn update(&mut self, sample_rate: f32, num_samples: usize) {
        let frequency = self.frequency.skip(num_samples);
        let gain_db = self.gain_db.skip(num_samples);
        let q = self.q.skip(num_samples);
        self.dirty = false;

        let was_flat = self.flat;
        self.flat = gain_db.abs() < BYPASS_GAIN_DB;
        if self.flat {
            self.coeffs = BiquadCoeffs::IDENTITY;
            return;
        }
        // A flat band is skipped, so its history is stale by now
        if was_flat {
            self.reset_states();
        }

        let frequency = frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY_RATIO * sample_rate);
        self.coeffs = BiquadCoeffs::calculate(
            self.band_type,
            sample_rate as f64,
            frequency as f64,
            gain_db as f64,
            q.clamp(MIN_Q, MAX_Q) as f64,
        );
    }

    fn reset_states(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }
}

// ============================================================================
// Parametric Equalizer
// ============================================================================

/// Four-band parametric equalizer
///
/// Out-of-range band indices are ignored by setters and read back neutral
/// defaults (0 / false / peaking) from getters.
#[derive(Debug, Clone)]
pub struct ParametricEqualizer {
    bands: [EqBand; NUM_BANDS],
    sample_rate: f32,
    ramp_seconds: f32,
    bypassed: bool,
}

impl ParametricEqualizer {
    /// Create an EQ with the default band layout, all bands flat
    pub fn new() -> Self {
        Self {
            bands: std::array::from_fn(|i| EqBand::new(DEFAULT_FREQUENCIES[i], DEFAULT_TYPES[i])),
            sample_rate: 0.0,
            ramp_seconds: DEFAULT_RAMP_SECONDS,
            bypassed: false,
        }
    }

    /// Ramp time used by frequency, gain and Q smoothers on `prepare`
    pub fn set_ramp_time(&mut self, seconds: f32) {
        self.ramp_seconds = seconds.max(0.0);
    }

    /// Set one band setting; the band's coefficients are refreshed before
    /// the next processed sample
    ///
    /// # Arguments
    /// * `index` - Band index (0..4); other indices are ignored
    /// * `parameter` - Which setting to change
    /// * `value` - New value; frequency, gain and Q are clamped to their ranges
    pub fn set_band_parameter(&mut self, index: usize, parameter: BandParameter, value: f32) {
        let Some(band) = self.bands.get_mut(index) else {
            return;
        };

        match parameter {
            BandParameter::Frequency => {
                band.requested_frequency = value.max(MIN_FREQUENCY);
                band.frequency.set_target(band.effective_frequency(self.sample_rate));
            }
            BandParameter::Gain => band.gain_db.set_target(value.clamp(MIN_GAIN_DB, MAX_GAIN_DB)),
            BandParameter::Q => band.q.set_target(value.clamp(MIN_Q, MAX_Q)),
            BandParameter::Enabled => {
                let enabled = value >= 0.5;
                if enabled && !band.enabled {
                    band.reset_states();
                }
                band.enabled = enabled;
            }
            BandParameter::Type => band.band_type = BandType::from_index(value),
        }
        band.dirty = true;
    }

    pub fn set_band_type(&mut self, index: usize, band_type: BandType) {
        self.set_band_parameter(index, BandParameter::Type, band_type.index());
    }

    pub fn set_band_enabled(&mut self, index: usize, enabled: bool) {
        self.set_band_parameter(index, BandParameter::Enabled, if enabled { 1.0 } else { 0.0 });
    }

    pub fn band_frequency(&self, index: usize) -> f32 {
        self.bands.get(index).map(|b| b.frequency.target_value()).unwrap_or(0.0)
    }

    pub fn band_gain(&self, index: usize) -> f32 {
        self.bands.get(index).map(|b| b.gain_db.target_value()).unwrap_or(0.0)
    }

    pub fn band_q(&self, index: usize) -> f32 {
        self.bands.get(index).map(|b| b.q.target_value()).unwrap_or(0.0)
    }

    pub fn band_enabled(&self, index: usize) -> bool {
        self.bands.get(index).map(|b| b.enabled).unwrap_or(false)
    }

    pub fn band_type(&self, index: usize) -> BandType {
        self.bands.get(index).map(|b| b.band_type).unwrap_or_default()
    }

    /// Combined magnitude response of all enabled bands in dB
    ///
    /// Uses the coefficients as of the last processed block.
    pub fn magnitude_db(&self, frequency: f32) -> f32 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.bands
            .iter()
            .filter(|b| b.enabled && !b.flat)
            .map(|b| b.coeffs.magnitude_db(self.sample_rate as f64, frequency as f64))
            .sum::<f64>() as f32
    }

    /// Run `len` samples starting at `start` through every active band
    fn process_span(&mut self, buffer: &mut AudioBuffer, start: usize, len: usize) {
        for band in self.bands.iter_mut().filter(|b| b.enabled && !b.flat) {
            let coeffs = band.coeffs;
            for (channel, state) in buffer.samples.iter_mut().zip(band.states.iter_mut()) {
                for sample in &mut channel[start..start + len] {
                    *sample = state.process(*sample as f64, &coeffs) as f32;
                }
            }
        }
    }
}

impl Default for ParametricEqualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectStage for ParametricEqualizer {
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<()> {
        spec.validate()?;
        self.sample_rate = spec.sample_rate;

        for band in &mut self.bands {
            // Re-derived from the request so a higher rate lifts an old clamp
            let frequency = band.effective_frequency(spec.sample_rate);
            band.frequency.set_current_and_target(frequency);
            band.frequency.reset(spec.sample_rate, self.ramp_seconds);
            band.gain_db.reset(spec.sample_rate, self.ramp_seconds);
            band.q.reset(spec.sample_rate, self.ramp_seconds);
            band.states = vec![BiquadState::default(); spec.num_channels];
            band.update(spec.sample_rate, 0);
        }
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let num_samples = buffer.num_samples();
        let sample_rate = self.sample_rate;
        if sample_rate <= 0.0 {
            return;
        }

        let mut start = 0;
        while start < num_samples {
            let gliding = self.bands.iter().any(|b| b.is_smoothing());
            let len = if gliding {
                COEFF_UPDATE_INTERVAL.min(num_samples - start)
            } else {
                num_samples - start
            };

            for band in &mut self.bands {
                if band.dirty || band.is_smoothing() {
                    band.update(sample_rate, len);
                }
            }

            self.process_span(buffer, start, len);
            start += len;
        }
    }

    fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset_states();
        }
    }

    impl_stage_common!(StageType::Equalizer, "Parametric EQ");

    fn set_parameter(&mut self, name: &str, value: f32) -> bool {
        if name == EQ_BYPASS {
            self.bypassed = value >= 0.5;
            return true;
        }
        match parse_band_name(name) {
            Some((index, parameter)) => {
                self.set_band_parameter(index, parameter, value);
                true
            }
            None => false,
        }
    }

    fn get_parameter(&self, name: &str) -> Option<f32> {
        if name == EQ_BYPASS {
            return Some(if self.bypassed { 1.0 } else { 0.0 });
        }
        let (index, parameter) = parse_band_name(name)?;
        Some(match parameter {
            BandParameter::Frequency => self.band_frequency(index),
            BandParameter::Gain => self.band_gain(index),
            BandParameter::Q => self.band_q(index),
            BandParameter::Enabled => {
                if self.band_enabled(index) {
                    1.0
                } else {
                    0.0
                }
            }
            BandParameter::Type => self.band_type(index).index(),
        })
    }
}
