//! Wavetable oscillator and the shared table registry.

use std::sync::Arc;

use super::{Oscillator, PhaseRandomizer, Waveform};
use crate::control::PendingCell;
use crate::error::ConfigError;

/// One waveform period sampled into a fixed table, shared read-only between
/// every oscillator that plays it.
#[derive(Debug, Clone)]
pub struct Wavetable {
    samples: Arc<[f32]>,
}

impl Wavetable {
    /// Sample `waveform` over its declared phase range into `size` entries.
    pub fn build(waveform: Waveform, size: usize) -> Result<Self, ConfigError> {
        if size < 2 {
            return Err(ConfigError::TableTooSmall { size });
        }
        let range = waveform.phase_range();
        let len = range.end - range.start;
        let samples = (0..size)
            .map(|n| waveform.value(len * n as f32 / size as f32 + range.start))
            .collect();
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Linear interpolation at a fractional index in `[0, len)`.
    fn lerp(&self, index: f32) -> f32 {
        let first = index as usize;
        let second = (first + 1) % self.samples.len();
        let second_weight = index - first as f32;
        (1.0 - second_weight) * self.samples[first] + second_weight * self.samples[second]
    }
}

/// Read-only registry of one table per waveform, built once at startup and
/// handed by shared ownership to every factory that needs it.
pub struct WavetableBank {
    sine: Wavetable,
    square: Wavetable,
    saw: Wavetable,
    triangle: Wavetable,
}

impl WavetableBank {
    pub fn build(table_size: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            sine: Wavetable::build(Waveform::Sine, table_size)?,
            square: Wavetable::build(Waveform::Square, table_size)?,
            saw: Wavetable::build(Waveform::Saw, table_size)?,
            triangle: Wavetable::build(Waveform::Triangle, table_size)?,
        })
    }

    pub fn table(&self, waveform: Waveform) -> Wavetable {
        match waveform {
            Waveform::Sine => self.sine.clone(),
            Waveform::Square => self.square.clone(),
            Waveform::Saw => self.saw.clone(),
            Waveform::Triangle => self.triangle.clone(),
        }
    }
}

/// Wavetable-playback oscillator: advances a fractional index by
/// `frequency · table_size / sample_rate` and interpolates between the two
/// nearest entries, wrapping modulo the table size.
pub struct TableOscillator {
    sample_rate: f32,
    table: Wavetable,
    index: f32,
    step: f32,
    pending_freq: PendingCell<f32>,
    randomizer: Option<PhaseRandomizer>,
}

impl TableOscillator {
    pub fn new(sample_rate: f32, table: Wavetable) -> Self {
        Self {
            sample_rate,
            table,
            index: 0.0,
            step: 0.0,
            pending_freq: PendingCell::new(),
            randomizer: None,
        }
    }

    pub fn with_phase_randomizer(mut self, randomizer: PhaseRandomizer) -> Self {
        self.randomizer = Some(randomizer);
        self
    }

    fn apply_pending(&mut self) {
        if let Some(freq) = self.pending_freq.take() {
            let size = self.table.len() as f32;
            self.step = *freq * size / self.sample_rate;
            self.index = match &mut self.randomizer {
                Some(randomizer) => randomizer.draw(0.0..size),
                None => 0.0,
            };
        }
    }
}

impl Oscillator for TableOscillator {
    fn set_frequency(&mut self, hz: f32) {
        self.pending_freq.write(hz);
    }

    fn next_sample(&mut self) -> f32 {
        self.apply_pending();
        let sample = self.table.lerp(self.index);
        self.index = (self.index + self.step) % self.table.len() as f32;
        sample
    }
}
