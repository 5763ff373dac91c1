//! Chain configuration
//!
//! Settings fixed for the lifetime of a prepared chain, loaded from JSON.

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::PannerMode;
use crate::error::{FxError, Result};

/// Longest delay a chain can be configured for, in ms
pub const MAX_CONFIGURABLE_DELAY_MS: f32 = 10_000.0;

/// Longest smoothing ramp accepted, in ms
const MAX_SMOOTHING_MS: f32 = 1000.0;

/// Configuration applied when an [`EffectChain`](crate::dsp::EffectChain) is built
///
/// # Example
/// ```
/// use multifx::config::ChainConfig;
///
/// let config = ChainConfig::from_json_str(r#"{ "max_delay_ms": 500.0 }"#).unwrap();
/// assert_eq!(config.max_delay_ms, 500.0);
/// assert_eq!(config.smoothing_ms, 20.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Ramp time for gain, distortion, delay and panner parameters (ms)
    pub smoothing_ms: f32,
    /// Ramp time for EQ frequency, gain and Q (ms)
    pub eq_smoothing_ms: f32,
    /// Delay line capacity (ms)
    pub max_delay_ms: f32,
    /// Panning law used by the panner stage
    pub panner_mode: PannerMode,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            smoothing_ms: 20.0,
            eq_smoothing_ms: 10.0,
            max_delay_ms: 2000.0,
            panner_mode: PannerMode::Auto,
        }
    }
}

impl ChainConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ChainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading chain config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field is usable
    pub fn validate(&self) -> Result<()> {
        check_smoothing("smoothing_ms", self.smoothing_ms)?;
        check_smoothing("eq_smoothing_ms", self.eq_smoothing_ms)?;

        if !self.max_delay_ms.is_finite()
            || self.max_delay_ms <= 0.0
            || self.max_delay_ms > MAX_CONFIGURABLE_DELAY_MS
        {
            return Err(FxError::InvalidConfig {
                reason: format!(
                    "max_delay_ms must be in (0, {}], got {}",
                    MAX_CONFIGURABLE_DELAY_MS, self.max_delay_ms
                ),
            });
        }
        Ok(())
    }

    /// Smoothing ramp in seconds
    pub fn smoothing_seconds(&self) -> f32 {
        self.smoothing_ms / 1000.0
    }

    /// EQ smoothing ramp in seconds
    pub fn eq_smoothing_seconds(&self) -> f32 {
        self.eq_smoothing_ms / 1000.0
    }
}

fn check_smoothing(field: &str, value: f32) -> Result<()> {
    if !value.is_finite() || !(0.0..=MAX_SMOOTHING_MS).contains(&value) {
        return Err(FxError::InvalidConfig {
            reason: format!("{field} must be in [0, {MAX_SMOOTHING_MS}], got {value}"),
        });
    }
    Ok(())
}
