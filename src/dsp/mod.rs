//! Per-sample processors: the ADSR envelope and the filter primitives.
//!
//! These components are allocation-free and realtime-safe, so they can be
//! embedded directly inside voice structs. Reconfiguration from the control
//! plane goes through each component's pending cell.

pub mod envelope;
pub mod filter;

pub use envelope::{AdsrEnvelope, EnvelopeData, EnvelopeStage};
pub use filter::{ClipFilter, LowPassFilter};

use crate::midi::MidiNote;

/// A sample-in, sample-out stage in a voice chain.
pub trait Processor: Send {
    fn process(&mut self, sample: f32) -> f32;

    /// Drop any internal memory. Stateless processors need not override.
    fn reset(&mut self) {}
}

/// Render-plane recipient of note lifecycle events. Implemented by voices,
/// envelopes, and stateful filters that must clear memory between notes.
pub trait NoteHandler: Send {
    fn note_on(&mut self, note: MidiNote);
    fn note_off(&mut self, note: MidiNote);
}

/// A processor that also follows the note lifecycle. Voice chains compose
/// these explicitly; there is no runtime capability discovery.
pub trait NoteProcessor: Processor + NoteHandler {}

impl<T: Processor + NoteHandler> NoteProcessor for T {}
