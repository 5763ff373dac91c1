//! Effect Chain
//!
//! Runs the six stages in their fixed order:
//! input gain → distortion → delay → pan → EQ → output gain.
//!
//! Parameter values live in a shared [`ParameterStore`]. Writers on any thread
//! update the store; `process` pulls whatever changed into the stages before
//! rendering the block.

use std::sync::Arc;

use log::{info, warn};

use crate::config::ChainConfig;
use crate::dsp::delay::{DelayLine, DEFAULT_MAX_DELAY_MS};
use crate::dsp::distortion::DistortionEngine;
use crate::dsp::effect::{EffectStage, ProcessSpec, StageType};
use crate::dsp::eq::ParametricEqualizer;
use crate::dsp::gain::GainStage;
use crate::dsp::panner::PannerEngine;
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::params::{ParameterStore, PARAMETERS};

/// The complete multi-effect chain
///
/// # Example
/// ```
/// use multifx::dsp::EffectChain;
/// use multifx::engine::AudioBuffer;
///
/// let mut chain = EffectChain::new();
/// chain.prepare(48000.0, 256, 2).unwrap();
/// chain.set_parameter("drive", 12.0);
/// chain.set_parameter("mix", 1.0);
///
/// let mut buffer = AudioBuffer::new(2, 256, 48000);
/// chain.process(&mut buffer);
/// assert!(buffer.is_finite());
/// ```
pub struct EffectChain {
    input: GainStage,
    distortion: DistortionEngine,
    delay: DelayLine,
    panner: PannerEngine,
    equalizer: ParametricEqualizer,
    output: GainStage,
    parameters: Arc<ParameterStore>,
    /// Last value bits pushed into the stages, one slot per descriptor
    applied: Vec<u32>,
    spec: Option<ProcessSpec>,
}

impl EffectChain {
    /// Create a chain with the default configuration
    pub fn new() -> Self {
        Self::with_config(&ChainConfig::default())
    }

    /// Create a chain from a validated configuration
    pub fn with_config(config: &ChainConfig) -> Self {
        let ramp = config.smoothing_seconds();

        let mut input = GainStage::input();
        let mut output = GainStage::output();
        let mut distortion = DistortionEngine::new();
        let mut delay = DelayLine::with_max_delay(config.max_delay_ms);
        let mut panner = PannerEngine::new(config.panner_mode);
        let mut equalizer = ParametricEqualizer::new();

        input.set_ramp_time(ramp);
        output.set_ramp_time(ramp);
        distortion.set_ramp_time(ramp);
        delay.set_ramp_time(ramp);
        panner.set_ramp_time(ramp);
        equalizer.set_ramp_time(config.eq_smoothing_seconds());

        if config.max_delay_ms < DEFAULT_MAX_DELAY_MS {
            warn!(
                "Delay capacity is {} ms; longer delay times will be clamped",
                config.max_delay_ms
            );
        }

        let parameters = Arc::new(ParameterStore::new());
        let applied = vec![0; parameters.len()];

        Self {
            input,
            distortion,
            delay,
            panner,
            equalizer,
            output,
            parameters,
            applied,
            spec: None,
        }
    }

    /// Configure every stage for a sample rate, block size and channel count
    ///
    /// May allocate. Must not run concurrently with `process`.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `max_block_size` - Largest block `process` will be handed
    /// * `num_channels` - Channels per block
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        max_block_size: usize,
        num_channels: usize,
    ) -> Result<()> {
        let spec = ProcessSpec::new(sample_rate, max_block_size, num_channels);
        spec.validate()?;

        // Targets first, so every smoother starts settled on its value
        self.push_all_parameters();

        for stage in StageType::ALL {
            self.stage_mut(stage).prepare(&spec)?;
        }

        info!(
            "Prepared chain: {} Hz, block {}, {} channels, delay capacity {} ms",
            sample_rate,
            max_block_size,
            num_channels,
            self.delay.max_delay_ms()
        );

        self.spec = Some(spec);
        Ok(())
    }

    /// Process one block in place
    ///
    /// Calling this before `prepare` is a precondition violation: it panics
    /// in debug builds and leaves the buffer untouched in release builds.
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        debug_assert!(self.spec.is_some(), "EffectChain::process called before prepare");
        if self.spec.is_none() {
            return;
        }

        self.sync_parameters();

        for stage in StageType::ALL {
            let stage = self.stage_mut(stage);
            if !stage.is_bypassed() {
                stage.process(buffer);
            }
        }
    }

    /// Clear delay lines, filter state and LFO phases without reallocating
    pub fn reset(&mut self) {
        self.sync_parameters();
        for stage in StageType::ALL {
            self.stage_mut(stage).reset();
        }
    }

    /// Set a named parameter
    ///
    /// Unknown names are ignored. The value reaches the stages at the start
    /// of the next `process` call.
    pub fn set_parameter(&self, name: &str, value: f32) -> bool {
        self.parameters.set(name, value)
    }

    /// Read a named parameter, 0.0 for unknown names
    pub fn get_parameter(&self, name: &str) -> f32 {
        self.parameters.get(name).unwrap_or(0.0)
    }

    /// Shared handle to the parameter store, for control threads
    pub fn parameters(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.parameters)
    }

    /// Spec from the last successful `prepare`
    pub fn process_spec(&self) -> Option<&ProcessSpec> {
        self.spec.as_ref()
    }

    pub fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    /// Look up a stage by type
    pub fn stage(&self, stage: StageType) -> &dyn EffectStage {
        match stage {
            StageType::InputGain => &self.input,
            StageType::Distortion => &self.distortion,
            StageType::Delay => &self.delay,
            StageType::Panner => &self.panner,
            StageType::Equalizer => &self.equalizer,
            StageType::OutputGain => &self.output,
        }
    }

    fn stage_mut(&mut self, stage: StageType) -> &mut dyn EffectStage {
        match stage {
            StageType::InputGain => &mut self.input,
            StageType::Distortion => &mut self.distortion,
            StageType::Delay => &mut self.delay,
            StageType::Panner => &mut self.panner,
            StageType::Equalizer => &mut self.equalizer,
            StageType::OutputGain => &mut self.output,
        }
    }

    pub fn distortion(&self) -> &DistortionEngine {
        &self.distortion
    }

    pub fn delay(&self) -> &DelayLine {
        &self.delay
    }

    pub fn panner(&self) -> &PannerEngine {
        &self.panner
    }

    pub fn equalizer(&self) -> &ParametricEqualizer {
        &self.equalizer
    }

    fn push_all_parameters(&mut self) {
        for (index, descriptor) in PARAMETERS.iter().enumerate() {
            let bits = self.parameters.bits(index);
            self.applied[index] = bits;
            self.stage_mut(descriptor.stage)
                .set_parameter(descriptor.name, f32::from_bits(bits));
        }
    }

    /// Forward store values that changed since the last sync
    fn sync_parameters(&mut self) {
        for (index, descriptor) in PARAMETERS.iter().enumerate() {
            let bits = self.parameters.bits(index);
            if bits == self.applied[index] {
                continue;
            }
            self.applied[index] = bits;
            self.stage_mut(descriptor.stage)
                .set_parameter(descriptor.name, f32::from_bits(bits));
        }
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("spec", &self.spec)
            .field("panner_mode", &self.panner.active_mode())
            .field("max_delay_ms", &self.delay.max_delay_ms())
            .finish()
    }
}
