pub mod control; // Lock-free pending/committed parameter hand-off
pub mod dsp; // Envelope and sample processors
pub mod error;
pub mod midi; // Commands, byte decoder, command router
pub mod osc; // Oscillators and composition wrappers
pub mod synth; // Voices, voice pool, note-event queue

pub use error::ConfigError;
