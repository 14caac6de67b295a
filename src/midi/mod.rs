//! MIDI-facing surface: command types, the byte-level stream decoder, the
//! criteria-matched command router, and the packet ingress that ties them
//! together.
//!
//! Everything here runs on the control plane. Note events destined for the
//! render plane cross over through [`crate::synth::note_queue`].

pub mod decoder;
pub mod ingress;
pub mod router;

pub use decoder::MidiDecoder;
pub use ingress::MidiIngress;
pub use router::{CommandRouter, ControlSink, NoteSink, SubscriberHandle};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type MidiValue = u8;
pub type MidiChannel = MidiValue;
pub type MidiNoteNumber = MidiValue;
pub type MidiVelocity = MidiValue;
pub type MidiController = MidiValue;

/// Largest data-byte value the protocol can carry.
pub const MAX_MIDI_VALUE: MidiValue = 127;

/// A key press or release: which key, how hard.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiNote {
    pub note: MidiNoteNumber,
    pub velocity: MidiVelocity,
}

/// One decoded MIDI message, as emitted by the decoder and consumed by the
/// router. Commands are immutable values; nothing downstream mutates them.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiCommand {
    NoteOn(MidiChannel, MidiNote),
    NoteOff(MidiChannel, MidiNote),
    ControlChange(MidiControllerId, MidiValue),
}

/// Exact identity of one controller on one channel. Emitted commands always
/// carry a concrete id; wildcards exist only on subscriptions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiControllerId {
    pub channel: MidiChannel,
    pub controller: MidiController,
}

/// Subscription matcher. A `None` field matches any value, so a criteria
/// with both fields `None` matches every command.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MidiControllerIdCriteria {
    pub channel: Option<MidiChannel>,
    pub controller: Option<MidiController>,
}

impl MidiControllerIdCriteria {
    pub fn channel(channel: MidiChannel) -> Self {
        Self {
            channel: Some(channel),
            controller: None,
        }
    }

    pub fn exact(id: MidiControllerId) -> Self {
        Self {
            channel: Some(id.channel),
            controller: Some(id.controller),
        }
    }

    pub fn matches(&self, id: MidiControllerId) -> bool {
        if let Some(channel) = self.channel {
            if channel != id.channel {
                return false;
            }
        }
        if let Some(controller) = self.controller {
            if controller != id.controller {
                return false;
            }
        }
        true
    }

    pub fn matches_channel(&self, channel: MidiChannel) -> bool {
        self.channel.map_or(true, |c| c == channel)
    }
}

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69.
#[inline]
pub fn midi_note_to_freq(note: MidiNoteNumber) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}
