//! Per-voice ADSR envelope.
//!
//! The shape is four linear segments:
//!
//! ```text
//!   level
//!     1.0 ┐     ╱╲
//!         │    ╱  ╲___________
//!     S   │   ╱               ╲
//!         │  ╱                 ╲
//!     0.0 └─╱───────────────────╲──→ time
//!          attack decay sustain release
//! ```
//!
//! Each segment interpolates from a captured start level toward its target,
//! so retriggering a still-sounding voice ramps from the current level
//! instead of popping to zero, and a release started mid-attack fades from
//! wherever the attack got to.
//!
//! Segment timing uses integer elapsed/total sample counters (total
//! pre-computed when the segment starts), so a 0.01 s attack at 48 kHz
//! reaches exactly 1.0 on sample 480 and release lands on exactly 0.0.
//!
//! Envelope parameters are replaced wholesale through the pending cell and
//! committed only when the next attack starts; an in-flight envelope never
//! sees a mid-segment parameter change.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{NoteHandler, Processor};
use crate::control::{param_pair, ParamReader, ParamWriter};
use crate::midi::{MidiNote, MidiNoteNumber};
use crate::synth::NoteState;

/// The four user-facing envelope parameters, replaced as one value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeData {
    /// Seconds from gate to full level.
    pub attack_time: f32,
    /// Seconds from full level to the sustain level.
    pub decay_time: f32,
    /// Held level while the key is down, 0.0 to 1.0.
    pub sustain_level: f32,
    /// Seconds from key-up to silence.
    pub release_time: f32,
}

impl Default for EnvelopeData {
    fn default() -> Self {
        Self {
            attack_time: 0.01,
            decay_time: 0.1,
            sustain_level: 0.7,
            release_time: 0.2,
        }
    }
}

impl EnvelopeData {
    /// Times floored at zero, sustain clamped into `[0, 1]`.
    pub fn sanitized(self) -> Self {
        Self {
            attack_time: self.attack_time.max(0.0),
            decay_time: self.decay_time.max(0.0),
            sustain_level: self.sustain_level.clamp(0.0, 1.0),
            release_time: self.release_time.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR amplitude envelope tied to one note at a time.
pub struct AdsrEnvelope {
    sample_rate: f32,

    data: EnvelopeData,
    pending: ParamReader<EnvelopeData>,
    writer: ParamWriter<EnvelopeData>,

    stage: EnvelopeStage,
    level: f32,
    start_level: f32,
    segment_elapsed: u32,
    segment_total: u32,
    held_note: Option<MidiNoteNumber>,
}

impl AdsrEnvelope {
    pub fn new(sample_rate: f32, data: EnvelopeData) -> Self {
        let data = data.sanitized();
        let (writer, pending) = param_pair(data);
        Self {
            sample_rate,
            data,
            pending,
            writer,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            start_level: 0.0,
            segment_elapsed: 0,
            segment_total: 1,
            held_note: None,
        }
    }

    /// Control-plane handle for wholesale parameter replacement. The write
    /// is committed at the start of the next attack, never mid-envelope.
    pub fn data_writer(&self) -> ParamWriter<EnvelopeData> {
        self.writer.clone()
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// The envelope's view of the note lifecycle, used by voices that tie
    /// their own reset to envelope completion.
    pub fn note_state(&self) -> NoteState {
        match self.stage {
            EnvelopeStage::Idle => NoteState::Idle,
            EnvelopeStage::Release => NoteState::Release,
            _ => NoteState::Play,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    fn segment_samples(&self, seconds: f32) -> u32 {
        (seconds * self.sample_rate).round().max(1.0) as u32
    }

    fn enter(&mut self, stage: EnvelopeStage, seconds: f32) {
        self.stage = stage;
        self.start_level = self.level;
        self.segment_elapsed = 0;
        self.segment_total = self.segment_samples(seconds);
    }

    fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.start_level = 0.0;
        self.segment_elapsed = 0;
        self.segment_total = 1;
        self.held_note = None;
    }

    /// Advance one sample and return the new level.
    fn advance(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }
            EnvelopeStage::Attack => {
                self.segment_elapsed += 1;
                let progress =
                    (self.segment_elapsed as f32 / self.segment_total as f32).min(1.0);
                self.level = self.start_level + (1.0 - self.start_level) * progress;
                if self.segment_elapsed >= self.segment_total {
                    let decay = self.data.decay_time;
                    self.enter(EnvelopeStage::Decay, decay);
                }
            }
            EnvelopeStage::Decay => {
                self.segment_elapsed += 1;
                let progress =
                    (self.segment_elapsed as f32 / self.segment_total as f32).min(1.0);
                self.level = self.start_level
                    + (self.data.sustain_level - self.start_level) * progress;
                if self.segment_elapsed >= self.segment_total {
                    self.stage = EnvelopeStage::Sustain;
                    self.level = self.data.sustain_level;
                }
            }
            EnvelopeStage::Sustain => {
                self.level = self.data.sustain_level;
            }
            EnvelopeStage::Release => {
                self.segment_elapsed += 1;
                let progress =
                    (self.segment_elapsed as f32 / self.segment_total as f32).min(1.0);
                self.level = self.start_level * (1.0 - progress);
                if self.segment_elapsed >= self.segment_total {
                    self.reset();
                }
            }
        }
        self.level
    }
}

impl NoteHandler for AdsrEnvelope {
    /// Gate high: commit any pending parameters, capture the current level
    /// as the attack's start, and record the held note.
    fn note_on(&mut self, note: MidiNote) {
        if self.pending.commit() {
            self.data = self.pending.value().sanitized();
        }
        self.held_note = Some(note.note);
        let attack = self.data.attack_time;
        self.enter(EnvelopeStage::Attack, attack);
    }

    /// Gate low, but only for the exact note this envelope is shaping; a
    /// release for any other note is ignored.
    fn note_off(&mut self, note: MidiNote) {
        if self.stage == EnvelopeStage::Idle || self.held_note != Some(note.note) {
            return;
        }
        let release = self.data.release_time;
        self.enter(EnvelopeStage::Release, release);
    }
}

impl Processor for AdsrEnvelope {
    fn process(&mut self, sample: f32) -> f32 {
        self.advance() * sample
    }

    fn reset(&mut self) {
        AdsrEnvelope::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn note(number: u8) -> MidiNote {
        MidiNote {
            note: number,
            velocity: 100,
        }
    }

    fn env(attack: f32, decay: f32, sustain: f32, release: f32) -> AdsrEnvelope {
        AdsrEnvelope::new(
            SAMPLE_RATE,
            EnvelopeData {
                attack_time: attack,
                decay_time: decay,
                sustain_level: sustain,
                release_time: release,
            },
        )
    }

    fn run(env: &mut AdsrEnvelope, samples: u32) {
        for _ in 0..samples {
            env.process(1.0);
        }
    }

    #[test]
    fn attack_reaches_full_level_on_the_exact_sample() {
        let mut env = env(0.01, 0.1, 0.7, 0.2);
        env.note_on(note(60));
        run(&mut env, 479);
        assert!(env.level() < 1.0);
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        env.process(1.0); // sample 480 = ceil(0.01 * 48000)
        assert!((env.level() - 1.0).abs() < 1e-6);
        assert_eq!(env.stage(), EnvelopeStage::Decay);
    }

    #[test]
    fn decay_settles_at_sustain() {
        let mut env = env(0.001, 0.01, 0.6, 0.2);
        env.note_on(note(60));
        run(&mut env, 48 + 480 + 8);
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn release_lands_on_zero_and_goes_idle() {
        let mut env = env(0.001, 0.01, 0.6, 0.2);
        env.note_on(note(60));
        run(&mut env, 2_000); // well into sustain
        env.note_off(note(60));
        run(&mut env, 9_600); // 0.2s * 48000
        assert_eq!(env.level(), 0.0);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.note_state(), NoteState::Idle);
    }

    #[test]
    fn note_off_for_a_different_note_is_ignored() {
        let mut env = env(0.001, 0.01, 0.6, 0.2);
        env.note_on(note(60));
        run(&mut env, 1_000);
        let stage = env.stage();
        env.note_off(note(61));
        assert_eq!(env.stage(), stage);
    }

    #[test]
    fn retrigger_ramps_from_the_current_level() {
        let mut env = env(0.01, 0.05, 0.8, 0.5);
        env.note_on(note(60));
        run(&mut env, 3_000);
        env.note_off(note(60));
        run(&mut env, 100); // partway into release
        let level_before = env.level();
        assert!(level_before > 0.0);
        env.note_on(note(64));
        env.process(1.0);
        // No pop: first attack sample continues from the captured level.
        assert!(env.level() >= level_before - 1e-6);
    }

    #[test]
    fn parameter_replacement_waits_for_the_next_attack() {
        let mut env = env(0.01, 0.01, 0.5, 0.2);
        env.note_on(note(60));
        run(&mut env, 2_000); // sustaining at 0.5
        env.data_writer().write(EnvelopeData {
            sustain_level: 0.9,
            ..EnvelopeData::default()
        });
        run(&mut env, 10);
        assert!((env.level() - 0.5).abs() < 1e-6, "no mid-envelope change");
        env.note_off(note(60));
        run(&mut env, 9_600 + 2);
        env.note_on(note(60));
        run(&mut env, 480 + 4_800 + 10); // default attack + decay, into sustain
        assert!((env.level() - 0.9).abs() < 1e-6, "committed at note_on");
    }

    #[test]
    fn processing_scales_the_input_sample() {
        let mut env = env(0.001, 0.01, 1.0, 0.2);
        env.note_on(note(60));
        run(&mut env, 1_000);
        let out = env.process(0.5);
        assert!((out - 0.5).abs() < 1e-6);
    }
}
