//! Wave-function oscillator: evaluate a waveform at a running phase.

use std::f32::consts::TAU;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Oscillator, PhaseRandomizer};
use crate::control::PendingCell;

/// The basic periodic shapes. Sine is defined over `[0, 2π)` so it can be
/// evaluated directly; the piecewise shapes use a normalized `[0, 1)` phase.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Saw,
        Waveform::Triangle,
    ];

    pub fn value(&self, x: f32) -> f32 {
        match self {
            Waveform::Sine => x.sin(),
            Waveform::Square => {
                if x < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * x - 1.0,
            Waveform::Triangle => 2.0 * (2.0 * x - 1.0).abs() - 1.0,
        }
    }

    pub fn phase_range(&self) -> Range<f32> {
        match self {
            Waveform::Sine => 0.0..TAU,
            _ => 0.0..1.0,
        }
    }
}

/// Phase-accumulator oscillator: each sample evaluates the waveform at the
/// current phase, then advances by `range_len · frequency / sample_rate`.
/// The phase wraps by subtracting the range length rather than re-seeding
/// the bound, preserving continuity across the wrap.
pub struct WaveOscillator {
    sample_rate: f32,
    waveform: Waveform,
    range: Range<f32>,
    phase: f32,
    delta: f32,
    pending_freq: PendingCell<f32>,
    randomizer: Option<PhaseRandomizer>,
}

impl WaveOscillator {
    pub fn new(sample_rate: f32, waveform: Waveform) -> Self {
        let range = waveform.phase_range();
        Self {
            sample_rate,
            waveform,
            phase: range.start,
            range,
            delta: 0.0,
            pending_freq: PendingCell::new(),
            randomizer: None,
        }
    }

    /// Draw the restart phase from a seeded generator instead of resetting
    /// to the range start.
    pub fn with_phase_randomizer(mut self, randomizer: PhaseRandomizer) -> Self {
        self.randomizer = Some(randomizer);
        self
    }

    fn apply_pending(&mut self) {
        if let Some(freq) = self.pending_freq.take() {
            self.delta = (self.range.end - self.range.start) * *freq / self.sample_rate;
            self.phase = match &mut self.randomizer {
                Some(randomizer) => randomizer.draw(self.range.clone()),
                None => self.range.start,
            };
        }
    }
}

impl Oscillator for WaveOscillator {
    fn set_frequency(&mut self, hz: f32) {
        self.pending_freq.write(hz);
    }

    fn next_sample(&mut self) -> f32 {
        self.apply_pending();
        let sample = self.waveform.value(self.phase);
        self.phase += self.delta;
        if self.phase >= self.range.end {
            self.phase -= self.range.end - self.range.start;
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn sine_tracks_the_analytic_waveform() {
        let mut osc = WaveOscillator::new(SAMPLE_RATE, Waveform::Sine);
        osc.set_frequency(440.0);
        for n in 0..256 {
            let expected = (TAU * 440.0 * n as f32 / SAMPLE_RATE).sin();
            let actual = osc.next_sample();
            assert!(
                (actual - expected).abs() < 1e-3,
                "sample {n}: expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn frequency_applies_at_the_next_sample_not_mid_stream() {
        let mut osc = WaveOscillator::new(SAMPLE_RATE, Waveform::Saw);
        osc.set_frequency(100.0);
        osc.next_sample();
        let delta_before = osc.delta;
        osc.set_frequency(200.0);
        // Pending until pulled.
        assert!((osc.delta - delta_before).abs() < f32::EPSILON);
        osc.next_sample();
        assert!((osc.delta - 2.0 * delta_before).abs() < 1e-7);
    }

    #[test]
    fn phase_wraps_by_subtraction() {
        let mut osc = WaveOscillator::new(1_000.0, Waveform::Saw);
        osc.set_frequency(900.0); // delta 0.9, wraps nearly every sample
        for _ in 0..64 {
            osc.next_sample();
            assert!((0.0..1.0).contains(&osc.phase));
        }
    }

    #[test]
    fn randomized_restart_phase_is_reproducible() {
        let phases = |seed| {
            let mut osc = WaveOscillator::new(SAMPLE_RATE, Waveform::Sine)
                .with_phase_randomizer(PhaseRandomizer::seeded(seed));
            osc.set_frequency(440.0);
            osc.next_sample()
        };
        assert_eq!(phases(7), phases(7));
        assert_ne!(phases(7), phases(8));
    }
}
