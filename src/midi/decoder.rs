//! Byte-level MIDI stream decoder.
//!
//! The decoder scans packets one byte at a time and emits structured
//! [`MidiCommand`]s through a caller-supplied callback. Its single hard
//! guarantee is forward progress: a truncated or unknown message never
//! stalls the scan. When the remaining bytes cannot complete the message
//! selected by the current status byte, the decoder advances exactly one
//! byte and keeps going, so malformed input degrades to a skipped byte
//! rather than a lost stream.
//!
//! Running status is not supported; a data byte in status position is
//! skipped like any other unknown byte.

use tracing::{debug, trace};

use super::{MidiCommand, MidiControllerId, MidiNote};

/// Status-nibble message types with a fixed length of three bytes.
const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const POLY_AFTERTOUCH: u8 = 0xA0;
const CONTROL_CHANGE: u8 = 0xB0;
const PITCH_BEND: u8 = 0xE0;
/// Two-byte channel messages.
const PROGRAM_CHANGE: u8 = 0xC0;
const CHANNEL_PRESSURE: u8 = 0xD0;
/// System messages.
const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;
const TIME_CODE: u8 = 0xF1;
const SONG_POSITION: u8 = 0xF2;
const SONG_SELECT: u8 = 0xF3;

/// Streaming decoder for raw MIDI byte packets.
///
/// Holds no buffered bytes between calls: partial messages at the end of a
/// packet are resolved by the skip-one-byte policy, which bounds the work
/// per call to one pass over the input.
#[derive(Debug, Default)]
pub struct MidiDecoder;

impl MidiDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Scan `bytes` and call `emit` for every complete command.
    ///
    /// Note On with velocity 0 is surfaced as Note Off; hardware commonly
    /// uses it for key release, and surfacing it as Note On would leave
    /// voices stuck.
    pub fn decode(&mut self, bytes: &[u8], mut emit: impl FnMut(MidiCommand)) {
        let mut i = 0;
        while i < bytes.len() {
            let status = bytes[i];
            let channel = status & 0x0F;

            match status & 0xF0 {
                NOTE_ON => match Self::data2(bytes, i) {
                    Some((note, velocity)) => {
                        let note = MidiNote { note, velocity };
                        if velocity == 0 {
                            emit(MidiCommand::NoteOff(channel, note));
                        } else {
                            emit(MidiCommand::NoteOn(channel, note));
                        }
                        i += 3;
                    }
                    None => i = Self::resync(bytes, i, "note on"),
                },
                NOTE_OFF => match Self::data2(bytes, i) {
                    Some((note, velocity)) => {
                        emit(MidiCommand::NoteOff(channel, MidiNote { note, velocity }));
                        i += 3;
                    }
                    None => i = Self::resync(bytes, i, "note off"),
                },
                CONTROL_CHANGE => match Self::data2(bytes, i) {
                    Some((controller, value)) => {
                        let id = MidiControllerId {
                            channel,
                            controller,
                        };
                        emit(MidiCommand::ControlChange(id, value));
                        i += 3;
                    }
                    None => i = Self::resync(bytes, i, "control change"),
                },
                // Channel messages the core does not act on. Consumed at
                // their fixed length so the scan stays aligned.
                POLY_AFTERTOUCH | PITCH_BEND => {
                    if i + 2 < bytes.len() {
                        trace!(status, "ignoring 3-byte channel message");
                        i += 3;
                    } else {
                        i = Self::resync(bytes, i, "3-byte channel message");
                    }
                }
                PROGRAM_CHANGE | CHANNEL_PRESSURE => {
                    if i + 1 < bytes.len() {
                        trace!(status, "ignoring 2-byte channel message");
                        i += 2;
                    } else {
                        i = Self::resync(bytes, i, "2-byte channel message");
                    }
                }
                0xF0 => i = self.decode_system(bytes, i),
                // Data byte in status position (running status, which we do
                // not support) or garbage: skip it.
                _ => {
                    trace!(byte = status, "skipping unexpected byte");
                    i += 1;
                }
            }
        }
    }

    /// System common / realtime messages, none of which surface as commands.
    /// Returns the next scan position.
    fn decode_system(&self, bytes: &[u8], i: usize) -> usize {
        match bytes[i] {
            SYSEX_START => {
                // Payload runs to the terminating 0xF7 and is discarded.
                match bytes[i + 1..].iter().position(|&b| b == SYSEX_END) {
                    Some(offset) => {
                        trace!(len = offset, "discarding sysex payload");
                        i + offset + 2
                    }
                    None => Self::resync(bytes, i, "sysex"),
                }
            }
            SONG_POSITION => {
                if i + 2 < bytes.len() {
                    i + 3
                } else {
                    Self::resync(bytes, i, "song position")
                }
            }
            TIME_CODE | SONG_SELECT => {
                if i + 1 < bytes.len() {
                    i + 2
                } else {
                    Self::resync(bytes, i, "system common")
                }
            }
            // Tune request, realtime clock/transport, active sensing,
            // reset, and anything undefined: single byte.
            _ => i + 1,
        }
    }

    /// Two data bytes following the status byte at `i`, if present.
    fn data2(bytes: &[u8], i: usize) -> Option<(u8, u8)> {
        if i + 2 < bytes.len() {
            Some((bytes[i + 1], bytes[i + 2]))
        } else {
            None
        }
    }

    /// The skip-one-byte recovery: log and advance a single position.
    fn resync(bytes: &[u8], i: usize, what: &'static str) -> usize {
        debug!(
            status = bytes[i],
            remaining = bytes.len() - i,
            "incomplete {what} message, resyncing"
        );
        i + 1
    }
}
