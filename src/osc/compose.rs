//! Composition wrappers: detune, weighted mix, waveform selection.
//!
//! Each wrapper owns the pending cell controlling its one adjustable knob
//! and exposes the matching [`ParamWriter`] for the control plane to hold.
//! Switches and weight changes therefore apply between samples, never mid-
//! sample.

use std::sync::Arc;

use super::Oscillator;
use crate::control::{param_pair, ParamReader, ParamWriter};
use crate::error::ConfigError;

/// Applies a cents-based multiplier `2^(cents/1200)` to every frequency
/// before delegating; samples pass through unchanged.
///
/// A cents change arrives through the pending cell and is folded in at the
/// next `set_frequency`, i.e. the next note the wrapped oscillator plays.
pub struct DetunedOscillator<O> {
    inner: O,
    cents: ParamReader<f32>,
    writer: ParamWriter<f32>,
}

impl<O: Oscillator> DetunedOscillator<O> {
    pub fn new(inner: O, cents: f32) -> Self {
        let (writer, reader) = param_pair(cents);
        Self {
            inner,
            cents: reader,
            writer,
        }
    }

    /// Control-plane handle for the detune amount, in cents.
    pub fn cents_writer(&self) -> ParamWriter<f32> {
        self.writer.clone()
    }
}

impl<O: Oscillator> Oscillator for DetunedOscillator<O> {
    fn set_frequency(&mut self, hz: f32) {
        let cents = *self.cents.latest();
        self.inner.set_frequency(hz * 2.0_f32.powf(cents / 1200.0));
    }

    fn next_sample(&mut self) -> f32 {
        self.inner.next_sample()
    }
}

/// Weighted parallel mix of N sources.
///
/// The sample is the weighted average `Σ(wᵢ·sᵢ) / Σwᵢ`, defined as 0 when
/// the total weight is 0 so an all-muted mixer is silent rather than NaN.
/// Weights are replaced wholesale; the shared slice keeps the render-side
/// commit to a reference-count bump.
pub struct MixedOscillator {
    sources: Vec<Box<dyn Oscillator>>,
    weights: ParamReader<Arc<[f32]>>,
    writer: ParamWriter<Arc<[f32]>>,
    // Last committed vector with one weight per source. Wrong-arity
    // commits never land here, so the zip below always covers every source.
    active: Arc<[f32]>,
}

impl MixedOscillator {
    pub fn new(sources: Vec<Box<dyn Oscillator>>, weights: &[f32]) -> Result<Self, ConfigError> {
        if sources.is_empty() {
            return Err(ConfigError::NoSources { kind: "mixer" });
        }
        if sources.len() != weights.len() {
            return Err(ConfigError::WeightCountMismatch {
                sources: sources.len(),
                weights: weights.len(),
            });
        }
        let active: Arc<[f32]> = Arc::from(weights);
        let (writer, reader) = param_pair(Arc::clone(&active));
        Ok(Self {
            sources,
            weights: reader,
            writer,
            active,
        })
    }

    /// Equal-weight mix.
    pub fn unison(sources: Vec<Box<dyn Oscillator>>) -> Result<Self, ConfigError> {
        let weights = vec![1.0; sources.len()];
        Self::new(sources, &weights)
    }

    /// Control-plane handle for the full weight vector. Writes must carry
    /// exactly one weight per source; a wrong-length vector is ignored at
    /// commit and the previous weights stay in effect.
    pub fn weights_writer(&self) -> ParamWriter<Arc<[f32]>> {
        self.writer.clone()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

impl Oscillator for MixedOscillator {
    fn set_frequency(&mut self, hz: f32) {
        for source in &mut self.sources {
            source.set_frequency(hz);
        }
    }

    fn next_sample(&mut self) -> f32 {
        if self.weights.commit() && self.weights.value().len() == self.sources.len() {
            self.active = Arc::clone(self.weights.value());
        }
        let mut total = 0.0;
        let mut mixed = 0.0;
        for (source, &weight) in self.sources.iter_mut().zip(self.active.iter()) {
            total += weight;
            mixed += weight * source.next_sample();
        }
        if total > 0.0 {
            mixed / total
        } else {
            0.0
        }
    }
}

/// Holds N sources and delegates both calls to the active one only. The
/// active index switches through the pending cell, between samples.
pub struct SelectableOscillator {
    sources: Vec<Box<dyn Oscillator>>,
    current: ParamReader<usize>,
    writer: ParamWriter<usize>,
}

impl SelectableOscillator {
    pub fn new(sources: Vec<Box<dyn Oscillator>>, current: usize) -> Result<Self, ConfigError> {
        if sources.is_empty() {
            return Err(ConfigError::NoSources { kind: "selector" });
        }
        let (writer, reader) = param_pair(current % sources.len());
        Ok(Self {
            sources,
            current: reader,
            writer,
        })
    }

    /// Control-plane handle for the active source index. Out-of-range
    /// indices wrap.
    pub fn index_writer(&self) -> ParamWriter<usize> {
        self.writer.clone()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn active(&mut self) -> &mut Box<dyn Oscillator> {
        let index = *self.current.latest() % self.sources.len();
        &mut self.sources[index]
    }
}

impl Oscillator for SelectableOscillator {
    fn set_frequency(&mut self, hz: f32) {
        self.active().set_frequency(hz);
    }

    fn next_sample(&mut self) -> f32 {
        self.active().next_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits a fixed value and records the last frequency it was given.
    struct Probe {
        value: f32,
        frequency: f32,
    }

    impl Probe {
        fn boxed(value: f32) -> Box<dyn Oscillator> {
            Box::new(Probe {
                value,
                frequency: 0.0,
            })
        }
    }

    impl Oscillator for Probe {
        fn set_frequency(&mut self, hz: f32) {
            self.frequency = hz;
        }
        fn next_sample(&mut self) -> f32 {
            self.value
        }
    }

    #[test]
    fn zero_total_weight_yields_exact_silence() {
        let sources = vec![Probe::boxed(1.0), Probe::boxed(-0.5), Probe::boxed(0.25)];
        let mut mixer = MixedOscillator::new(sources, &[0.0, 0.0, 0.0]).unwrap();
        let sample = mixer.next_sample();
        assert_eq!(sample, 0.0);
        assert!(!sample.is_nan());
    }

    #[test]
    fn mix_is_the_weighted_average() {
        let sources = vec![Probe::boxed(1.0), Probe::boxed(0.0)];
        let mut mixer = MixedOscillator::new(sources, &[3.0, 1.0]).unwrap();
        assert!((mixer.next_sample() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn weight_updates_apply_at_the_next_sample() {
        let sources = vec![Probe::boxed(1.0), Probe::boxed(-1.0)];
        let mut mixer = MixedOscillator::new(sources, &[1.0, 0.0]).unwrap();
        let writer = mixer.weights_writer();
        assert!((mixer.next_sample() - 1.0).abs() < 1e-6);
        writer.write(Arc::from([0.0f32, 1.0].as_slice()));
        assert!((mixer.next_sample() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn wrong_length_weight_writes_keep_the_previous_mix() {
        let sources = vec![Probe::boxed(1.0), Probe::boxed(0.0)];
        let mut mixer = MixedOscillator::new(sources, &[3.0, 1.0]).unwrap();
        let writer = mixer.weights_writer();
        assert!((mixer.next_sample() - 0.75).abs() < 1e-6);
        writer.write(Arc::from([1.0f32].as_slice()));
        assert!((mixer.next_sample() - 0.75).abs() < 1e-6);
        // A well-formed write still lands.
        writer.write(Arc::from([0.0f32, 1.0].as_slice()));
        assert!(mixer.next_sample().abs() < 1e-6);
    }

    #[test]
    fn empty_or_mismatched_mixers_are_rejected() {
        assert!(MixedOscillator::new(Vec::new(), &[]).is_err());
        assert!(MixedOscillator::new(vec![Probe::boxed(0.0)], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn detune_scales_frequency_by_cents() {
        let mut detuned = DetunedOscillator::new(
            Probe {
                value: 0.0,
                frequency: 0.0,
            },
            1200.0, // one octave up
        );
        detuned.set_frequency(440.0);
        assert!((detuned.inner.frequency - 880.0).abs() < 1e-3);
    }

    #[test]
    fn detune_change_waits_for_the_next_frequency() {
        let mut detuned = DetunedOscillator::new(
            Probe {
                value: 0.0,
                frequency: 0.0,
            },
            0.0,
        );
        let writer = detuned.cents_writer();
        detuned.set_frequency(440.0);
        assert!((detuned.inner.frequency - 440.0).abs() < 1e-3);
        writer.write(-1200.0);
        detuned.set_frequency(440.0);
        assert!((detuned.inner.frequency - 220.0).abs() < 1e-3);
    }

    #[test]
    fn selector_switches_between_samples_only() {
        let sources = vec![Probe::boxed(0.25), Probe::boxed(0.5), Probe::boxed(0.75)];
        let mut selector = SelectableOscillator::new(sources, 0).unwrap();
        let writer = selector.index_writer();
        assert!((selector.next_sample() - 0.25).abs() < 1e-6);
        writer.write(2);
        assert!((selector.next_sample() - 0.75).abs() < 1e-6);
        // Out-of-range selection wraps.
        writer.write(4);
        assert!((selector.next_sample() - 0.5).abs() < 1e-6);
        assert!(SelectableOscillator::new(Vec::new(), 0).is_err());
    }
}
