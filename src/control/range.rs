//! Linear mapping between raw 7-bit control values and semantic ranges.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::midi::{MidiValue, MAX_MIDI_VALUE};

/// A half-open semantic range `[min, max)` a controller sweeps over.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    min: f32,
    max: f32,
}

impl ParamRange {
    /// Fails fast on a zero-length (or inverted) range; render-time code
    /// relies on `len > 0`.
    pub fn new(min: f32, max: f32) -> Result<Self, ConfigError> {
        if max <= min {
            return Err(ConfigError::ZeroLengthRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn len(&self) -> f32 {
        self.max - self.min
    }

    /// Map a raw control value into the range:
    /// `value · len / 127 + min`.
    pub fn value_from_midi(&self, value: MidiValue) -> f32 {
        f32::from(value) * self.len() / f32::from(MAX_MIDI_VALUE) + self.min
    }

    /// Exact algebraic inverse of [`ParamRange::value_from_midi`]. Feeds
    /// observers and UI read-back only; it never flows back into state.
    pub fn value_to_midi(&self, value: f32) -> MidiValue {
        let raw = f32::from(MAX_MIDI_VALUE) * (value - self.min) / self.len();
        raw.clamp(0.0, f32::from(MAX_MIDI_VALUE)) as MidiValue
    }
}
