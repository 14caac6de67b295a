//! A single voice: oscillator, optional amplitude envelope, and an ordered
//! processing chain, driven through the note lifecycle.
//!
//! The lifecycle is strict: Idle → Play on `note_on`, Play → Release on a
//! matching `note_off`, Release → Idle when the release policy completes.
//! Release is governed either by a sample countdown (`ReleaseMode::ByTime`)
//! or by polling the envelope's own state (`ReleaseMode::ByEnvelope`), so no
//! timers or threads are involved on the render path.

use crate::dsp::{AdsrEnvelope, NoteHandler, NoteProcessor, Processor};
use crate::midi::{midi_note_to_freq, MidiNote, MidiNoteNumber, MAX_MIDI_VALUE};
use crate::osc::Oscillator;

/// Where a voice is in its note lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Idle,
    Play,
    Release,
}

impl NoteState {
    pub fn is_idle(self) -> bool {
        self == NoteState::Idle
    }

    pub fn is_playing(self) -> bool {
        self == NoteState::Play
    }

    pub fn is_releasing(self) -> bool {
        self == NoteState::Release
    }
}

/// How a voice decides that its release phase has finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleaseMode {
    /// Free the voice a fixed number of seconds after `note_off`, counted
    /// in samples on the render thread.
    ByTime(f32),
    /// Follow the envelope: the voice is free when the envelope reports
    /// idle again.
    ByEnvelope,
}

/// One stage of a voice's processing chain. The distinction is explicit:
/// note-aware stages receive the note lifecycle, plain stages only see
/// samples.
pub enum ChainLink {
    Plain(Box<dyn Processor>),
    NoteAware(Box<dyn NoteProcessor>),
}

impl ChainLink {
    fn process(&mut self, sample: f32) -> f32 {
        match self {
            ChainLink::Plain(p) => p.process(sample),
            ChainLink::NoteAware(p) => p.process(sample),
        }
    }

    fn note_on(&mut self, note: MidiNote) {
        if let ChainLink::NoteAware(p) = self {
            p.note_on(note);
        }
    }

    fn note_off(&mut self, note: MidiNote) {
        if let ChainLink::NoteAware(p) = self {
            p.note_off(note);
        }
    }
}

pub struct Voice {
    oscillator: Box<dyn Oscillator>,
    envelope: Option<AdsrEnvelope>,
    chain: Vec<ChainLink>,
    state: NoteState,
    held_note: Option<MidiNoteNumber>,
    amplitude: f32,
    release: ReleaseMode,
    release_countdown: u32,
    sample_rate: f32,
}

impl Voice {
    pub fn new(sample_rate: f32, oscillator: Box<dyn Oscillator>) -> Self {
        Self {
            oscillator,
            envelope: None,
            chain: Vec::new(),
            state: NoteState::Idle,
            held_note: None,
            amplitude: 0.0,
            release: ReleaseMode::ByTime(0.0),
            release_countdown: 0,
            sample_rate,
        }
    }

    /// Attach an amplitude envelope. Switches the release policy to
    /// `ByEnvelope` so voice lifetime follows the envelope's tail.
    pub fn with_envelope(mut self, envelope: AdsrEnvelope) -> Self {
        self.envelope = Some(envelope);
        self.release = ReleaseMode::ByEnvelope;
        self
    }

    /// Free the voice a fixed time after `note_off` instead of following
    /// the envelope.
    pub fn with_release_time(mut self, seconds: f32) -> Self {
        self.release = ReleaseMode::ByTime(seconds);
        self
    }

    pub fn with_processor(mut self, processor: Box<dyn Processor>) -> Self {
        self.chain.push(ChainLink::Plain(processor));
        self
    }

    pub fn with_note_processor(mut self, processor: Box<dyn NoteProcessor>) -> Self {
        self.chain.push(ChainLink::NoteAware(processor));
        self
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    pub fn held_note(&self) -> Option<MidiNoteNumber> {
        self.held_note
    }

    /// A voice can take a note when it is idle, or when it already holds
    /// that same note number (retrigger).
    pub fn can_play(&self, note: MidiNote) -> bool {
        self.state.is_idle() || self.held_note == Some(note.note)
    }

    pub fn note_on(&mut self, note: MidiNote) {
        self.oscillator.set_frequency(midi_note_to_freq(note.note));
        self.amplitude = f32::from(note.velocity) / f32::from(MAX_MIDI_VALUE);
        if let Some(env) = &mut self.envelope {
            env.note_on(note);
        }
        for link in &mut self.chain {
            link.note_on(note);
        }
        self.held_note = Some(note.note);
        self.state = NoteState::Play;
        self.release_countdown = 0;
    }

    pub fn note_off(&mut self, note: MidiNote) {
        if self.held_note != Some(note.note) {
            return;
        }
        if let Some(env) = &mut self.envelope {
            env.note_off(note);
        }
        for link in &mut self.chain {
            link.note_off(note);
        }
        match self.release {
            ReleaseMode::ByTime(seconds) => {
                let samples = (seconds * self.sample_rate).round() as u32;
                if samples == 0 {
                    self.free();
                } else {
                    self.state = NoteState::Release;
                    self.release_countdown = samples;
                }
            }
            ReleaseMode::ByEnvelope => {
                self.state = NoteState::Release;
            }
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.state.is_idle() {
            return 0.0;
        }
        let mut sample = self.oscillator.next_sample() * self.amplitude;
        if let Some(env) = &mut self.envelope {
            sample = env.process(sample);
        }
        for link in &mut self.chain {
            sample = link.process(sample);
        }
        match self.release {
            ReleaseMode::ByTime(_) => {
                if self.state.is_releasing() {
                    self.release_countdown -= 1;
                    if self.release_countdown == 0 {
                        self.free();
                    }
                }
            }
            ReleaseMode::ByEnvelope => {
                if let Some(env) = &self.envelope {
                    if env.note_state().is_idle() {
                        self.free();
                    }
                }
            }
        }
        sample
    }

    fn free(&mut self) {
        self.state = NoteState::Idle;
        self.held_note = None;
        self.amplitude = 0.0;
        self.release_countdown = 0;
        if let Some(env) = &mut self.envelope {
            Processor::reset(env);
        }
        for link in &mut self.chain {
            match link {
                ChainLink::Plain(p) => p.reset(),
                ChainLink::NoteAware(p) => p.reset(),
            }
        }
    }
}
