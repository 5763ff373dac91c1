//! Audio Buffer
//!
//! Non-interleaved 32-bit float buffer processed in place by every stage.

use crate::error::{FxError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `f32::NEG_INFINITY` for zero or negative input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// RMS level of one channel, linear scale
pub fn channel_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Multi-channel audio block: `samples[channel][sample]`
///
/// # Example
/// ```
/// use multifx::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::new(2, 512, 48000);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.num_samples(), 512);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer with `num_channels` channels of `num_samples` each
    pub fn new(num_channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Wrap existing channel data
    ///
    /// All channels must have the same length.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let len = samples.first().map(|ch| ch.len()).unwrap_or(0);
        if samples.iter().any(|ch| ch.len() != len) {
            return Err(FxError::UnsupportedFormat {
                format: "channels of unequal length".to_string(),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `num_channels` - Number of channels in the data
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(FxError::InvalidChannelCount { channels: 0 });
        }

        if interleaved.len() % num_channels != 0 {
            return Err(FxError::UnsupportedFormat {
                format: format!(
                    "interleaved length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.num_channels();
        let num_samples = self.num_samples();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }
        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    ///
    /// Channels pushed in through `samples` may differ in length; the
    /// shortest one bounds every per-sample loop.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.samples.iter().map(|ch| ch.len()).min().unwrap_or(0)
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    /// Immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Mutable access to the first two channels at once
    ///
    /// Returns `None` for buffers with fewer than two channels.
    #[inline]
    pub fn stereo_pair_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        match self.samples.as_mut_slice() {
            [left, right, ..] => Some((left.as_mut_slice(), right.as_mut_slice())),
            _ => None,
        }
    }

    /// Get a sample, or `None` if out of bounds
    #[inline]
    pub fn get_sample(&self, channel: usize, index: usize) -> Option<f32> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(index).copied())
    }

    /// Set a sample; returns false if out of bounds
    #[inline]
    pub fn set_sample(&mut self, channel: usize, index: usize, value: f32) -> bool {
        if let Some(sample) = self.samples.get_mut(channel).and_then(|ch| ch.get_mut(index)) {
            *sample = value;
            return true;
        }
        false
    }

    /// Zero every sample
    pub fn clear(&mut self) {
        for channel in &mut self.samples {
            channel.fill(0.0);
        }
    }

    /// Check that no sample is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_db_conversion() {
        assert_abs_diff_eq!(db_to_linear(0.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(db_to_linear(-6.0), 0.501187, epsilon = 1e-4);
        assert_abs_diff_eq!(linear_to_db(0.5), -6.0206, epsilon = 1e-3);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn test_interleave_roundtrip() {
        let interleaved = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();

        assert_eq!(buffer.channel(0), &[1.0, 3.0, 5.0]);
        assert_eq!(buffer.channel(1), &[2.0, 4.0, 6.0]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_from_interleaved_rejects_ragged() {
        let result = AudioBuffer::from_interleaved(&[1.0, 2.0, 3.0], 2, 44100);
        assert!(matches!(result, Err(FxError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_from_channels_rejects_unequal() {
        let result = AudioBuffer::from_channels(vec![vec![0.0; 4], vec![0.0; 3]], 48000);
        assert!(result.is_err());
    }

    #[test]
    fn test_num_samples_uses_shortest_channel() {
        let ragged = AudioBuffer {
            samples: vec![vec![1.0; 8], vec![2.0; 3]],
            sample_rate: 48000,
        };
        assert_eq!(ragged.num_samples(), 3);
        assert_eq!(ragged.to_interleaved(), vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert_eq!(AudioBuffer::new(0, 0, 48000).num_samples(), 0);
    }

    #[test]
    fn test_stereo_pair() {
        let mut mono = AudioBuffer::new(1, 8, 48000);
        assert!(mono.stereo_pair_mut().is_none());

        let mut stereo = AudioBuffer::new(2, 8, 48000);
        let (left, right) = stereo.stereo_pair_mut().unwrap();
        left[0] = 1.0;
        right[0] = -1.0;
        assert_eq!(stereo.get_sample(0, 0), Some(1.0));
        assert_eq!(stereo.get_sample(1, 0), Some(-1.0));
        assert_eq!(stereo.get_sample(2, 0), None);
    }

    #[test]
    fn test_channel_rms() {
        assert_eq!(channel_rms(&[]), 0.0);
        assert_abs_diff_eq!(channel_rms(&[1.0, -1.0, 1.0, -1.0]), 1.0, epsilon = 1e-6);
    }
}
