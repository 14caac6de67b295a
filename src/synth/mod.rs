//! Voice assembly and polyphony: a [`Voice`] wraps an oscillator graph,
//! optional envelope, and an ordered chain of processors; a [`VoicePool`]
//! holds a fixed set of voices and hands incoming notes to them. Note
//! events cross from the control plane into the render plane through the
//! lock-free queue in [`queue`].

pub mod pool;
pub mod queue;
pub mod voice;

pub use pool::VoicePool;
pub use queue::{note_queue, NoteEvent, NoteReceiver, NoteSender};
pub use voice::{ChainLink, NoteState, ReleaseMode, Voice};
