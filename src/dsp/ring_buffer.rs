//! Multi-channel circular sample store
//!
//! One contiguous allocation split into equal per-channel regions, each with
//! its own write cursor. Capacity is fixed by [`RingBuffer::prepare`] and
//! never changes while processing.

use crate::error::{FxError, Result};

/// Fixed-capacity per-channel ring buffer
#[derive(Debug, Clone, Default)]
pub struct RingBuffer {
    /// Channel-major storage: channel `c` occupies `[c * capacity, (c + 1) * capacity)`
    storage: Vec<f32>,
    capacity: usize,
    num_channels: usize,
    write_cursors: Vec<usize>,
}

/// Products this close to a whole sample count are not rounded up
const WHOLE_SAMPLE_TOLERANCE: f64 = 1e-6;

/// Samples needed to hold `seconds` of audio, rounding partial samples up
///
/// Computed in f64 with a small tolerance, so f32 rounding in either
/// argument (0.004 s is stored as 0.0040000002) never adds a sample.
fn duration_to_samples(sample_rate: f32, seconds: f32) -> usize {
    let exact = sample_rate as f64 * seconds as f64;
    let nearest = exact.round();
    if (exact - nearest).abs() < WHOLE_SAMPLE_TOLERANCE * nearest.max(1.0) {
        nearest as usize
    } else {
        exact.ceil() as usize
    }
}

impl RingBuffer {
    /// Create an empty, unprepared ring buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `ceil(max_duration_seconds * sample_rate)` samples per channel
    ///
    /// Always holds at least one sample per channel. Existing contents are
    /// discarded and all cursors return to zero.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `block_size` - Maximum block size (must be non-zero)
    /// * `num_channels` - Number of independent channels
    /// * `max_duration_seconds` - Longest span of history to keep
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        block_size: usize,
        num_channels: usize,
        max_duration_seconds: f32,
    ) -> Result<()> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(FxError::InvalidSampleRate { sample_rate });
        }
        if block_size == 0 {
            return Err(FxError::InvalidBlockSize { block_size });
        }
        if num_channels == 0 {
            return Err(FxError::InvalidChannelCount {
                channels: num_channels,
            });
        }
        if !max_duration_seconds.is_finite() || max_duration_seconds < 0.0 {
            return Err(FxError::InvalidMaxDelay {
                max_delay_ms: max_duration_seconds * 1000.0,
            });
        }

        let capacity = duration_to_samples(sample_rate, max_duration_seconds).max(1);

        self.capacity = capacity;
        self.num_channels = num_channels;
        self.storage = vec![0.0; capacity * num_channels];
        self.write_cursors = vec![0; num_channels];
        Ok(())
    }

    /// Store `sample` at the channel's cursor and advance the cursor
    ///
    /// Writes to a channel that was not prepared are ignored.
    #[inline]
    pub fn write_and_advance(&mut self, channel: usize, sample: f32) {
        if channel >= self.num_channels {
            return;
        }
        let cursor = self.write_cursors[channel];
        self.storage[channel * self.capacity + cursor] = sample;
        self.write_cursors[channel] = if cursor + 1 == self.capacity {
            0
        } else {
            cursor + 1
        };
    }

    /// Sample written `offset_back + 1` writes ago
    ///
    /// `read_at(ch, 0)` is the most recent write. Offsets past the end of
    /// the history are clamped to `capacity - 1`; unprepared channels read 0.
    #[inline]
    pub fn read_at(&self, channel: usize, offset_back: usize) -> f32 {
        if channel >= self.num_channels {
            return 0.0;
        }
        let offset = offset_back.min(self.capacity - 1);
        let cursor = self.write_cursors[channel];
        // cursor < capacity and offset + 1 <= capacity, so one correction suffices
        let index = if cursor > offset {
            cursor - 1 - offset
        } else {
            cursor + self.capacity - 1 - offset
        };
        self.storage[channel * self.capacity + index]
    }

    /// Zero all samples and rewind the cursors without reallocating
    pub fn clear(&mut self) {
        self.storage.fill(0.0);
        self.write_cursors.fill(0);
    }

    /// Samples held per channel
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Current write cursor for a channel, or `None` if out of range
    pub fn write_cursor(&self, channel: usize) -> Option<usize> {
        self.write_cursors.get(channel).copied()
    }

    /// True once `prepare` has allocated storage
    pub fn is_prepared(&self) -> bool {
        self.capacity > 0
    }
}
