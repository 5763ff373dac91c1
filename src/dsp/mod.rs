//! DSP Effects Library
//!
//! The stages of the multi-effect chain and the building blocks they share.
//! Every stage implements the `EffectStage` trait for uniform processing.

mod chain;
mod delay;
mod distortion;
mod effect;
mod eq;
mod gain;
mod panner;
mod ring_buffer;
mod smoothing;

pub use chain::EffectChain;
pub use delay::{DelayLine, DelayType, DEFAULT_MAX_DELAY_MS};
pub use distortion::{DistortionEngine, DistortionType};
pub use effect::{EffectStage, ProcessSpec, StageType, MAX_CHANNELS};
pub use eq::{
    parse_band_name, BandParameter, BandType, ParametricEqualizer, COEFF_UPDATE_INTERVAL,
    NUM_BANDS,
};
pub use gain::GainStage;
pub use panner::{pan_gains, MonoPanner, PannerEngine, PannerMode, StereoPanner};
pub use ring_buffer::RingBuffer;
pub use smoothing::SmoothedParameter;
