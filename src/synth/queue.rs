//! Lock-free note event hand-off from the control plane to the render plane.
//!
//! The sender side is a router subscriber; the receiver side lives on the
//! render thread and is drained by the voice pool before producing samples.
//! `rtrb` is SPSC, so the producer sits behind a mutex: the router may
//! dispatch from any control-plane thread, but only one at a time. The
//! render thread never touches that lock.

use std::sync::Arc;

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

use crate::midi::{MidiChannel, MidiNote, NoteSink};

/// A note lifecycle event as it travels to the render thread. Channel
/// information is already consumed by subscription filtering upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On(MidiNote),
    Off(MidiNote),
}

/// Control-plane half of the note queue. Register with a
/// [`CommandRouter`](crate::midi::CommandRouter) to feed it.
pub struct NoteSender {
    tx: Mutex<Producer<NoteEvent>>,
}

impl NoteSender {
    fn push(&self, event: NoteEvent) {
        if self.tx.lock().push(event).is_err() {
            warn!(?event, "note queue full, dropping event");
        }
    }
}

impl NoteSink for NoteSender {
    fn note_on(&self, _channel: MidiChannel, note: MidiNote) {
        self.push(NoteEvent::On(note));
    }

    fn note_off(&self, _channel: MidiChannel, note: MidiNote) {
        self.push(NoteEvent::Off(note));
    }
}

/// Render-plane half of the note queue.
pub struct NoteReceiver {
    rx: Consumer<NoteEvent>,
}

impl NoteReceiver {
    /// Pop the next pending event, if any. Wait-free.
    pub fn pop(&mut self) -> Option<NoteEvent> {
        self.rx.pop().ok()
    }
}

/// Build a bounded note queue. The sender is `Arc`-wrapped so it can be
/// handed straight to the router as a subscriber.
pub fn note_queue(capacity: usize) -> (Arc<NoteSender>, NoteReceiver) {
    let (tx, rx) = RingBuffer::new(capacity);
    (
        Arc::new(NoteSender { tx: Mutex::new(tx) }),
        NoteReceiver { rx },
    )
}
