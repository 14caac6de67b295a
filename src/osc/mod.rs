//! Sample generators.
//!
//! Concrete oscillators ([`WaveOscillator`], [`TableOscillator`]) pull their
//! frequency through a local [`crate::control::PendingCell`], so a frequency
//! written from the control plane only takes effect at the start of the next
//! `next_sample` call. The composition wrappers in [`compose`] layer
//! detuning, weighted mixing, and waveform selection on top of any source.

pub mod compose;
pub mod table;
pub mod wave;

use std::ops::Range;

use rand::{rngs::SmallRng, Rng, RngCore, SeedableRng};

pub use compose::{DetunedOscillator, MixedOscillator, SelectableOscillator};
pub use table::{TableOscillator, Wavetable, WavetableBank};
pub use wave::{WaveOscillator, Waveform};

use crate::error::ConfigError;
use std::sync::Arc;

/// A tone source. `set_frequency` may be called from the control plane; the
/// new frequency is applied at the start of the next `next_sample`.
pub trait Oscillator: Send {
    fn set_frequency(&mut self, hz: f32);
    fn next_sample(&mut self) -> f32;
}

/// Allow boxed oscillators in composition lists.
impl Oscillator for Box<dyn Oscillator> {
    fn set_frequency(&mut self, hz: f32) {
        (**self).set_frequency(hz)
    }

    fn next_sample(&mut self) -> f32 {
        (**self).next_sample()
    }
}

/// Deterministic phase source. Restarting several detuned copies of the same
/// oscillator at phase zero produces comb artifacts; drawing each restart
/// phase from a seeded generator decorrelates them while keeping tests
/// reproducible.
pub struct PhaseRandomizer {
    rng: SmallRng,
}

impl PhaseRandomizer {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn draw(&mut self, range: Range<f32>) -> f32 {
        self.rng.gen_range(range)
    }
}

/// Builds oscillators for voice graphs, handing each one its own
/// deterministically-seeded phase randomizer.
///
/// With a wavetable bank attached, the factory produces table-backed
/// oscillators sharing the bank's precomputed tables; without one, it
/// produces direct wave-function oscillators.
pub struct OscillatorFactory {
    sample_rate: f32,
    bank: Option<Arc<WavetableBank>>,
    seeds: SmallRng,
}

impl OscillatorFactory {
    pub fn wave(sample_rate: f32, seed: u64) -> Self {
        Self {
            sample_rate,
            bank: None,
            seeds: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn wavetable(sample_rate: f32, bank: Arc<WavetableBank>, seed: u64) -> Self {
        Self {
            sample_rate,
            bank: Some(bank),
            seeds: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn oscillator(&mut self, waveform: Waveform) -> Box<dyn Oscillator> {
        let randomizer = PhaseRandomizer::seeded(self.seeds.next_u64());
        match &self.bank {
            Some(bank) => Box::new(
                TableOscillator::new(self.sample_rate, bank.table(waveform))
                    .with_phase_randomizer(randomizer),
            ),
            None => Box::new(
                WaveOscillator::new(self.sample_rate, waveform)
                    .with_phase_randomizer(randomizer),
            ),
        }
    }

    /// One oscillator per waveform, ready for a selectable wrapper.
    pub fn all_waveforms(&mut self) -> Result<SelectableOscillator, ConfigError> {
        let sources = Waveform::ALL
            .iter()
            .map(|&w| self.oscillator(w))
            .collect();
        SelectableOscillator::new(sources, 0)
    }
}
