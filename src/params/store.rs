//! Lock-free parameter store
//!
//! One `AtomicU32` (f32 bits) per descriptor. Any thread may write through a
//! shared reference; the audio thread reads with relaxed loads. A value is
//! always observed whole, never torn.

use std::sync::atomic::{AtomicU32, Ordering};

use super::descriptors::{self, ParameterDescriptor, PARAMETERS};
use crate::error::{FxError, Result};

/// Shared, lock-free home for every named parameter value
#[derive(Debug)]
pub struct ParameterStore {
    values: Vec<AtomicU32>,
}

impl ParameterStore {
    /// Create a store holding every parameter at its default
    pub fn new() -> Self {
        Self {
            values: PARAMETERS
                .iter()
                .map(|p| AtomicU32::new(p.default.to_bits()))
                .collect(),
        }
    }

    /// Set a parameter, clamped to its range
    ///
    /// Returns false for unknown names, which are otherwise ignored.
    /// NaN leaves the stored value unchanged.
    pub fn set(&self, name: &str, value: f32) -> bool {
        match descriptors::index_of(name) {
            Some(index) => {
                self.set_index(index, value);
                true
            }
            None => false,
        }
    }

    /// Strict variant of [`set`](Self::set) for configuration code
    pub fn try_set(&self, name: &str, value: f32) -> Result<()> {
        let index = descriptors::index_of(name).ok_or_else(|| FxError::UnknownParameter {
            name: name.to_string(),
        })?;
        if value.is_nan() {
            return Err(FxError::InvalidParameterValue {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        self.set_index(index, value);
        Ok(())
    }

    /// Current value, or `None` for unknown names
    pub fn get(&self, name: &str) -> Option<f32> {
        descriptors::index_of(name).map(|index| self.get_index(index))
    }

    /// Set by position in the descriptor table; out-of-range indices are ignored
    pub fn set_index(&self, index: usize, value: f32) {
        if let (Some(slot), Some(descriptor)) = (self.values.get(index), PARAMETERS.get(index)) {
            if let Some(value) = descriptor.sanitize(value) {
                slot.store(value.to_bits(), Ordering::Relaxed);
            }
        }
    }

    /// Read by position in the descriptor table; out-of-range indices read 0
    #[inline]
    pub fn get_index(&self, index: usize) -> f32 {
        self.values
            .get(index)
            .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }

    /// Raw bit pattern for change detection
    #[inline]
    pub(crate) fn bits(&self, index: usize) -> u32 {
        self.values
            .get(index)
            .map(|slot| slot.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Restore every parameter to its default
    pub fn reset_to_defaults(&self) {
        for (slot, descriptor) in self.values.iter().zip(PARAMETERS) {
            slot.store(descriptor.default.to_bits(), Ordering::Relaxed);
        }
    }

    /// Number of parameters held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn descriptors(&self) -> &'static [ParameterDescriptor] {
        PARAMETERS
    }

    /// Copy of every (name, value) pair, in table order
    pub fn snapshot(&self) -> Vec<(&'static str, f32)> {
        PARAMETERS
            .iter()
            .enumerate()
            .map(|(index, p)| (p.name, self.get_index(index)))
            .collect()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
