//! Parameter smoothing
//!
//! Linear ramps between control targets so that parameter changes never
//! produce a step in the audio. A ramp of `n` samples lands exactly on the
//! target after `n` calls to [`SmoothedParameter::advance`].

/// Linearly ramped scalar parameter
///
/// # Example
/// ```
/// use multifx::dsp::SmoothedParameter;
///
/// let mut gain = SmoothedParameter::new(0.0);
/// gain.reset(1000.0, 0.004); // 4 sample ramp
/// gain.set_target(1.0);
/// for _ in 0..4 {
///     gain.advance();
/// }
/// assert_eq!(gain.current_value(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct SmoothedParameter {
    current: f32,
    target: f32,
    step: f32,
    countdown: usize,
    ramp_samples: usize,
    sample_rate: f32,
}

impl SmoothedParameter {
    /// Create a parameter resting at `initial` with no ramp configured
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            countdown: 0,
            ramp_samples: 0,
            sample_rate: 0.0,
        }
    }

    /// Configure the ramp length and snap the current value to the target
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz; non-positive rates disable ramping
    /// * `ramp_seconds` - Ramp duration in seconds
    pub fn reset(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.sample_rate = sample_rate;
        self.ramp_samples = if sample_rate > 0.0 && ramp_seconds > 0.0 {
            (ramp_seconds * sample_rate).round() as usize
        } else {
            0
        };
        self.current = self.target;
        self.step = 0.0;
        self.countdown = 0;
    }

    /// Begin gliding from the current value towards `value`
    ///
    /// A change arriving mid-ramp restarts the ramp from wherever the value
    /// currently is, so the output never jumps.
    pub fn set_target(&mut self, value: f32) {
        if value == self.target && self.countdown == 0 {
            return;
        }
        self.target = value;

        if self.ramp_samples == 0 {
            self.current = value;
            self.step = 0.0;
            self.countdown = 0;
            return;
        }

        self.countdown = self.ramp_samples;
        self.step = (self.target - self.current) / self.ramp_samples as f32;
    }

    /// Jump to `value` immediately, abandoning any ramp in progress
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.countdown = 0;
    }

    /// Advance one sample and return the new value
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.countdown == 0 {
            return self.current;
        }

        self.countdown -= 1;
        if self.countdown == 0 {
            self.current = self.target;
        } else {
            self.current += self.step;
        }
        self.current
    }

    /// Advance `num_samples` samples at once and return the new value
    pub fn skip(&mut self, num_samples: usize) -> f32 {
        if num_samples >= self.countdown {
            self.current = self.target;
            self.countdown = 0;
        } else {
            self.countdown -= num_samples;
            self.current += self.step * num_samples as f32;
        }
        self.current
    }

    /// Value as of the last advance
    #[inline]
    pub fn current_value(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target_value(&self) -> f32 {
        self.target
    }

    /// True while a ramp is in progress
    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.countdown > 0
    }

    /// Configured ramp length in samples
    pub fn ramp_samples(&self) -> usize {
        self.ramp_samples
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl Default for SmoothedParameter {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_arrives_exactly_after_ramp() {
        let mut param = SmoothedParameter::new(0.0);
        param.reset(48000.0, 0.02);
        assert_eq!(param.ramp_samples(), 960);

        param.set_target(0.37);
        for _ in 0..959 {
            param.advance();
        }
        assert!(param.is_smoothing());
        param.advance();
        assert_eq!(param.current_value(), 0.37);
        assert!(!param.is_smoothing());
    }

    #[test]
    fn test_ramp_is_linear() {
        let mut param = SmoothedParameter::new(0.0);
        param.reset(100.0, 0.1); // 10 samples
        param.set_target(1.0);

        let first = param.advance();
        let second = param.advance();
        assert_abs_diff_eq!(first, 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(second, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_retarget_mid_ramp_starts_from_current() {
        let mut param = SmoothedParameter::new(0.0);
        param.reset(100.0, 0.1);
        param.set_target(1.0);
        for _ in 0..5 {
            param.advance();
        }
        let before = param.current_value();
        param.set_target(0.0);
        let after = param.advance();

        // One step of size (0 - 0.5) / 10 from the current value
        assert_abs_diff_eq!(before, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(after, 0.45, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_ramp_jumps() {
        let mut param = SmoothedParameter::new(0.0);
        param.reset(48000.0, 0.0);
        param.set_target(2.0);
        assert_eq!(param.current_value(), 2.0);
        assert!(!param.is_smoothing());
    }

    #[test]
    fn test_zero_sample_rate_is_guarded() {
        let mut param = SmoothedParameter::new(1.0);
        param.reset(0.0, 0.02);
        param.set_target(3.0);
        assert_eq!(param.advance(), 3.0);
        assert!(param.current_value().is_finite());
    }

    #[test]
    fn test_reset_snaps_to_target() {
        let mut param = SmoothedParameter::new(0.0);
        param.reset(100.0, 0.1);
        param.set_target(1.0);
        param.advance();
        param.reset(100.0, 0.1);
        assert_eq!(param.current_value(), 1.0);
    }

    #[test]
    fn test_skip() {
        let mut param = SmoothedParameter::new(0.0);
        param.reset(100.0, 0.1);
        param.set_target(1.0);
        assert_abs_diff_eq!(param.skip(4), 0.4, epsilon = 1e-6);
        assert_eq!(param.skip(100), 1.0);
        assert!(!param.is_smoothing());
    }
}
