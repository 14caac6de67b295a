//! Fixed-size polyphony. All voices are created up front; the render path
//! never allocates or reorders them.

use tracing::warn;

use super::queue::{NoteEvent, NoteReceiver};
use super::voice::Voice;
use crate::error::ConfigError;
use crate::midi::MidiNote;

pub struct VoicePool {
    voices: Vec<Voice>,
    events: Option<NoteReceiver>,
    dropped_notes: u64,
}

impl VoicePool {
    pub fn new(voices: Vec<Voice>) -> Result<Self, ConfigError> {
        if voices.is_empty() {
            return Err(ConfigError::EmptyVoicePool);
        }
        Ok(Self {
            voices,
            events: None,
            dropped_notes: 0,
        })
    }

    /// Attach the render-plane end of a note queue. Events are drained at
    /// the start of every `render` call.
    pub fn with_events(mut self, events: NoteReceiver) -> Self {
        self.events = Some(events);
        self
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Notes dropped because every voice was busy. Diagnostic only.
    pub fn dropped_notes(&self) -> u64 {
        self.dropped_notes
    }

    /// Assign a note to the first voice that can take it; failing that,
    /// the first releasing voice is stolen. When neither exists the note
    /// is dropped, which is audible but never fatal.
    pub fn note_on(&mut self, note: MidiNote) {
        if let Some(voice) = self.voices.iter_mut().find(|v| v.can_play(note)) {
            voice.note_on(note);
            return;
        }
        if let Some(voice) = self.voices.iter_mut().find(|v| v.state().is_releasing()) {
            voice.note_on(note);
            return;
        }
        self.dropped_notes += 1;
        warn!(note = note.note, dropped = self.dropped_notes, "no free voice, dropping note");
    }

    /// Every voice sees the off event; voices holding a different note
    /// ignore it themselves.
    pub fn note_off(&mut self, note: MidiNote) {
        for voice in &mut self.voices {
            voice.note_off(note);
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        self.voices.iter_mut().map(Voice::next_sample).sum()
    }

    /// Apply all pending note events from the queue.
    pub fn drain_events(&mut self) {
        let Some(mut events) = self.events.take() else {
            return;
        };
        while let Some(event) = events.pop() {
            match event {
                NoteEvent::On(note) => self.note_on(note),
                NoteEvent::Off(note) => self.note_off(note),
            }
        }
        self.events = Some(events);
    }

    /// Drain pending events, then fill the whole buffer.
    pub fn render(&mut self, out: &mut [f32]) {
        self.drain_events();
        for slot in out.iter_mut() {
            *slot = self.next_sample();
        }
    }
}
