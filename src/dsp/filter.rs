//! Sample processors chained after a voice: hard clip and one-pole low-pass.

use std::f32::consts::TAU;

use super::{NoteHandler, Processor};
use crate::control::{param_pair, ParamReader, ParamWriter};
use crate::midi::MidiNote;

/// Hard clamp into `[min, max]`. Stateless.
pub struct ClipFilter {
    min: f32,
    max: f32,
}

impl ClipFilter {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// The usual `[-1, 1]` output guard.
    pub fn unit() -> Self {
        Self::new(-1.0, 1.0)
    }
}

impl Processor for ClipFilter {
    fn process(&mut self, sample: f32) -> f32 {
        sample.clamp(self.min, self.max)
    }
}

/// Single-pole exponential low-pass:
/// `out = prev + alpha · (in − prev)` with
/// `alpha = 1 − exp(−2π · min(cutoff, sr/2) / sr)`.
///
/// The cutoff is control-plane adjustable through the pending cell; alpha is
/// recomputed only when a cutoff commit lands. The one-sample memory is
/// cleared on `reset` and on note start, so a new note does not inherit the
/// previous note's filter tail.
pub struct LowPassFilter {
    sample_rate: f32,
    alpha: f32,
    previous: f32,
    cutoff: ParamReader<f32>,
    writer: ParamWriter<f32>,
}

impl LowPassFilter {
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        let (writer, cutoff) = param_pair(cutoff_hz);
        Self {
            sample_rate,
            alpha: Self::alpha_for(cutoff_hz, sample_rate),
            previous: 0.0,
            cutoff,
            writer,
        }
    }

    /// Control-plane handle for the cutoff frequency in Hz.
    pub fn cutoff_writer(&self) -> ParamWriter<f32> {
        self.writer.clone()
    }

    fn alpha_for(cutoff_hz: f32, sample_rate: f32) -> f32 {
        let clamped = cutoff_hz.clamp(0.0, sample_rate / 2.0);
        1.0 - (-TAU * clamped / sample_rate).exp()
    }
}

impl Processor for LowPassFilter {
    fn process(&mut self, sample: f32) -> f32 {
        if self.cutoff.commit() {
            self.alpha = Self::alpha_for(*self.cutoff.value(), self.sample_rate);
        }
        let output = self.previous + self.alpha * (sample - self.previous);
        self.previous = output;
        output
    }

    fn reset(&mut self) {
        self.previous = 0.0;
    }
}

impl NoteHandler for LowPassFilter {
    fn note_on(&mut self, _note: MidiNote) {
        self.reset();
    }

    fn note_off(&mut self, _note: MidiNote) {}
}
