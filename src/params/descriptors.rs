//! Static parameter table
//!
//! Every host-visible parameter, its range and its default, grouped by the
//! stage that consumes it. Order within a stage is the order values are
//! pushed into that stage on `prepare`.

use crate::dsp::StageType;
use serde::Serialize;

// ============================================================================
// Parameter Names
// ============================================================================

pub const INPUT: &str = "input";
pub const OUTPUT: &str = "output";

pub const DRIVE: &str = "drive";
pub const MIX: &str = "mix";
pub const DISTORTION_OUTPUT: &str = "distortionOutput";
pub const DISTORTION_TYPE: &str = "distortiontype";
pub const DISTORTION_BYPASS: &str = "distortionBypass";

pub const DELAY_TIME_LEFT: &str = "delayTimeLeft";
pub const DELAY_TIME_RIGHT: &str = "delayTimeRight";
pub const FEEDBACK: &str = "feedback";
pub const DELAY_MIX: &str = "delayMix";
pub const DELAY_TYPE: &str = "delaytype";
pub const DELAY_BYPASS: &str = "delayBypass";

pub const PAN: &str = "pan";
pub const LEFT_PAN: &str = "leftPan";
pub const RIGHT_PAN: &str = "rightPan";
pub const LFO_FREQ: &str = "lfoFreq";
pub const LEFT_LFO_FREQ: &str = "leftLfoFreq";
pub const RIGHT_LFO_FREQ: &str = "rightLfoFreq";
pub const LFO_DEPTH: &str = "lfoDepth";
pub const LEFT_LFO_DEPTH: &str = "leftLfoDepth";
pub const RIGHT_LFO_DEPTH: &str = "rightLfoDepth";
pub const LFO_ENABLED: &str = "lfoEnabled";
pub const PANNER_BYPASS: &str = "pannerBypass";

pub const EQ_BYPASS: &str = "eqBypass";

/// How a parameter's raw value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Any value in `[min, max]`
    Continuous,
    /// Integer index in `[min, max]`
    Choice,
    /// 0 = off, 1 = on
    Toggle,
}

/// Static description of one named parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    #[serde(skip)]
    pub stage: StageType,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub kind: ParameterKind,
}

impl ParameterDescriptor {
    const fn continuous(
        name: &'static str,
        display_name: &'static str,
        stage: StageType,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            display_name,
            stage,
            min,
            max,
            default,
            kind: ParameterKind::Continuous,
        }
    }

    const fn choice(
        name: &'static str,
        display_name: &'static str,
        stage: StageType,
        last_index: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            display_name,
            stage,
            min: 0.0,
            max: last_index,
            default,
            kind: ParameterKind::Choice,
        }
    }

    const fn toggle(
        name: &'static str,
        display_name: &'static str,
        stage: StageType,
        default: bool,
    ) -> Self {
        Self {
            name,
            display_name,
            stage,
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
            kind: ParameterKind::Toggle,
        }
    }

    /// Map a raw value into this parameter's legal set
    ///
    /// Returns `None` for NaN, which has no meaningful nearest value.
    pub fn sanitize(&self, value: f32) -> Option<f32> {
        if value.is_nan() {
            return None;
        }
        let clamped = value.clamp(self.min, self.max);
        Some(match self.kind {
            ParameterKind::Continuous => clamped,
            ParameterKind::Choice => clamped.round(),
            ParameterKind::Toggle => {
                if clamped >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        })
    }
}

use ParameterDescriptor as P;
use StageType::{Delay, Distortion, Equalizer, InputGain, OutputGain, Panner};

/// Every parameter the chain understands, in stage order
pub static PARAMETERS: &[ParameterDescriptor] = &[
    P::continuous(INPUT, "Input Gain", InputGain, -24.0, 24.0, 0.0),
    // Distortion
    P::continuous(DRIVE, "Drive", Distortion, 0.0, 24.0, 0.0),
    P::continuous(MIX, "Distortion Mix", Distortion, 0.0, 1.0, 0.0),
    P::continuous(DISTORTION_OUTPUT, "Distortion Output", Distortion, -24.0, 24.0, 0.0),
    P::choice(DISTORTION_TYPE, "Distortion Type", Distortion, 2.0, 0.0),
    P::toggle(DISTORTION_BYPASS, "Distortion Bypass", Distortion, false),
    // Delay
    P::continuous(DELAY_TIME_LEFT, "Delay Time Left", Delay, 0.0, 2000.0, 0.0),
    P::continuous(DELAY_TIME_RIGHT, "Delay Time Right", Delay, 0.0, 2000.0, 0.0),
    P::continuous(FEEDBACK, "Feedback", Delay, 0.0, 1.0, 0.0),
    P::continuous(DELAY_MIX, "Delay Mix", Delay, 0.0, 1.0, 0.0),
    P::choice(DELAY_TYPE, "Delay Type", Delay, 1.0, 0.0),
    P::toggle(DELAY_BYPASS, "Delay Bypass", Delay, false),
    // Panner
    P::continuous(PAN, "Pan", Panner, -1.0, 1.0, 0.0),
    P::continuous(LEFT_PAN, "Left Pan", Panner, -1.0, 1.0, 0.0),
    P::continuous(RIGHT_PAN, "Right Pan", Panner, -1.0, 1.0, 0.0),
    P::continuous(LFO_FREQ, "LFO Rate", Panner, 0.0, 20.0, 0.0),
    P::continuous(LEFT_LFO_FREQ, "Left LFO Rate", Panner, 0.0, 20.0, 0.0),
    P::continuous(RIGHT_LFO_FREQ, "Right LFO Rate", Panner, 0.0, 20.0, 0.0),
    P::continuous(LFO_DEPTH, "LFO Depth", Panner, 0.0, 1.0, 0.0),
    P::continuous(LEFT_LFO_DEPTH, "Left LFO Depth", Panner, 0.0, 1.0, 0.0),
    P::continuous(RIGHT_LFO_DEPTH, "Right LFO Depth", Panner, 0.0, 1.0, 0.0),
    P::toggle(LFO_ENABLED, "LFO Enabled", Panner, false),
    P::toggle(PANNER_BYPASS, "Panner Bypass", Panner, false),
    // Equalizer
    P::continuous("band0_frequency", "Low Shelf Frequency", Equalizer, 20.0, 500.0, 100.0),
    P::continuous("band0_gain", "Low Shelf Gain", Equalizer, -24.0, 24.0, 0.0),
    P::continuous("band0_q", "Low Shelf Q", Equalizer, 0.1, 20.0, 0.707),
    P::toggle("band0_enabled", "Low Shelf Enabled", Equalizer, true),
    P::choice("band0_type", "Band 1 Type", Equalizer, 2.0, 0.0),
    P::continuous("band1_frequency", "Low Mid Frequency", Equalizer, 100.0, 2000.0, 500.0),
    P::continuous("band1_gain", "Low Mid Gain", Equalizer, -24.0, 24.0, 0.0),
    P::continuous("band1_q", "Low Mid Q", Equalizer, 0.1, 20.0, 0.707),
    P::toggle("band1_enabled", "Low Mid Enabled", Equalizer, true),
    P::choice("band1_type", "Band 2 Type", Equalizer, 2.0, 1.0),
    P::continuous("band2_frequency", "High Mid Frequency", Equalizer, 500.0, 8000.0, 2000.0),
    P::continuous("band2_gain", "High Mid Gain", Equalizer, -24.0, 24.0, 0.0),
    P::continuous("band2_q", "High Mid Q", Equalizer, 0.1, 20.0, 0.707),
    P::toggle("band2_enabled", "High Mid Enabled", Equalizer, true),
    P::choice("band2_type", "Band 3 Type", Equalizer, 2.0, 1.0),
    P::continuous("band3_frequency", "High Shelf Frequency", Equalizer, 2000.0, 20000.0, 8000.0),
    P::continuous("band3_gain", "High Shelf Gain", Equalizer, -24.0, 24.0, 0.0),
    P::continuous("band3_q", "High Shelf Q", Equalizer, 0.1, 20.0, 0.707),
    P::toggle("band3_enabled", "High Shelf Enabled", Equalizer, true),
    P::choice("band3_type", "Band 4 Type", Equalizer, 2.0, 2.0),
    P::toggle(EQ_BYPASS, "EQ Bypass", Equalizer, false),
    P::continuous(OUTPUT, "Output Gain", OutputGain, -24.0, 24.0, 0.0),
];

/// Look up a parameter by name
pub fn find(name: &str) -> Option<&'static ParameterDescriptor> {
    PARAMETERS.iter().find(|p| p.name == name)
}

/// Position of a parameter in [`PARAMETERS`]
pub fn index_of(name: &str) -> Option<usize> {
    PARAMETERS.iter().position(|p| p.name == name)
}

/// Parameters consumed by one stage, in push order
pub fn descriptors_for(stage: StageType) -> impl Iterator<Item = &'static ParameterDescriptor> {
    PARAMETERS.iter().filter(move |p| p.stage == stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<&str> = PARAMETERS.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), PARAMETERS.len());
    }

    #[test]
    fn test_defaults_within_range() {
        for p in PARAMETERS {
            assert!(
                p.default >= p.min && p.default <= p.max,
                "{} default {} outside [{}, {}]",
                p.name,
                p.default,
                p.min,
                p.max
            );
        }
    }

    #[test]
    fn test_table_is_in_chain_order() {
        let positions: Vec<usize> = PARAMETERS
            .iter()
            .map(|p| StageType::ALL.iter().position(|s| *s == p.stage).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_descriptors_for_stage() {
        let eq: Vec<&str> = descriptors_for(StageType::Equalizer).map(|p| p.name).collect();
        assert_eq!(eq.len(), 21);
        assert_eq!(eq[0], "band0_frequency");

        let input: Vec<&str> = descriptors_for(StageType::InputGain).map(|p| p.name).collect();
        assert_eq!(input, vec![INPUT]);
    }

    #[test_case(DRIVE, 30.0, Some(24.0) ; "continuous clamps high")]
    #[test_case(PAN, -3.0, Some(-1.0) ; "continuous clamps low")]
    #[test_case(DISTORTION_TYPE, 1.4, Some(1.0) ; "choice rounds")]
    #[test_case(DISTORTION_TYPE, 7.0, Some(2.0) ; "choice clamps")]
    #[test_case(LFO_ENABLED, 0.7, Some(1.0) ; "toggle on")]
    #[test_case(LFO_ENABLED, 0.2, Some(0.0) ; "toggle off")]
    #[test_case(FEEDBACK, f32::NAN, None ; "nan rejected")]
    fn test_sanitize(name: &str, value: f32, expected: Option<f32>) {
        assert_eq!(find(name).unwrap().sanitize(value), expected);
    }

    #[test]
    fn test_unknown_lookup() {
        assert!(find("wobble").is_none());
        assert!(index_of("band4_gain").is_none());
    }
}
