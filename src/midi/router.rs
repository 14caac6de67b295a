//! Criteria-matched command fan-out.
//!
//! The router delivers decoded commands to subscribers: note handlers get
//! NoteOn/NoteOff filtered by channel, control handlers get ControlChange
//! filtered by channel and controller. Subscribers are held weakly — the
//! router never owns a subscriber's lifetime, since a DSP node's graph can
//! be torn down independently of the control plane that configured it.
//!
//! The registry is an arena of generation-counted slots. Registration hands
//! back a [`SubscriberHandle`]; unregistering through a stale handle is a
//! no-op. Slots whose subscriber has been dropped are reclaimed during
//! dispatch and reused through a free list, so dead entries cost O(1) each
//! exactly once instead of being scanned forever.
//!
//! Dispatch runs on the control plane. It is safe to call concurrently with
//! registration; a registration that completes before a dispatch begins is
//! visible to that dispatch.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use super::{MidiChannel, MidiCommand, MidiControllerId, MidiControllerIdCriteria, MidiNote};

/// Control-plane recipient of note events. Implementations queue or apply
/// the event; they must not block.
pub trait NoteSink: Send + Sync {
    fn note_on(&self, channel: MidiChannel, note: MidiNote);
    fn note_off(&self, channel: MidiChannel, note: MidiNote);
}

/// Control-plane recipient of control-change events.
pub trait ControlSink: Send + Sync {
    fn control_changed(&self, id: MidiControllerId, value: super::MidiValue);
}

/// Stable reference to one registration. Carries the slot's generation so a
/// recycled slot cannot be unregistered through an old handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberHandle {
    index: usize,
    generation: u64,
}

struct Slot<S: ?Sized> {
    generation: u64,
    entry: Option<(Weak<S>, MidiControllerIdCriteria)>,
}

struct Registry<S: ?Sized> {
    slots: Vec<Slot<S>>,
    free: Vec<usize>,
}

impl<S: ?Sized> Default for Registry<S> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<S: ?Sized> Registry<S> {
    fn insert(&mut self, subscriber: Weak<S>, criteria: MidiControllerIdCriteria) -> SubscriberHandle {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation += 1;
                slot.entry = Some((subscriber, criteria));
                SubscriberHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some((subscriber, criteria)),
                });
                SubscriberHandle {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn remove(&mut self, handle: SubscriberHandle) -> bool {
        match self.slots.get_mut(handle.index) {
            Some(slot) if slot.generation == handle.generation && slot.entry.is_some() => {
                slot.entry = None;
                self.free.push(handle.index);
                true
            }
            _ => false,
        }
    }

    /// Visit live entries whose criteria pass `filter`, reclaiming any slot
    /// whose subscriber has been dropped along the way.
    fn for_each_live(
        &mut self,
        filter: impl Fn(&MidiControllerIdCriteria) -> bool,
        mut visit: impl FnMut(&Arc<S>),
    ) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some((subscriber, criteria)) = slot.entry.as_ref() else {
                continue;
            };
            match subscriber.upgrade() {
                Some(live) => {
                    if filter(criteria) {
                        visit(&live);
                    }
                }
                None => {
                    trace!(index, "pruning dead subscriber slot");
                    slot.entry = None;
                    self.free.push(index);
                }
            }
        }
    }

    fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| {
                s.entry
                    .as_ref()
                    .is_some_and(|(w, _)| w.strong_count() > 0)
            })
            .count()
    }
}

/// Fans decoded commands out to registered note and control subscribers.
#[derive(Default)]
pub struct CommandRouter {
    notes: RwLock<Registry<dyn NoteSink>>,
    controls: RwLock<Registry<dyn ControlSink>>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a note subscriber. Only the criteria's channel field is
    /// consulted for note events. Eligible from the next dispatch onward.
    pub fn register_notes(
        &self,
        subscriber: &Arc<impl NoteSink + 'static>,
        criteria: MidiControllerIdCriteria,
    ) -> SubscriberHandle {
        let weak = Arc::downgrade(subscriber);
        let weak: Weak<dyn NoteSink> = weak;
        self.notes.write().insert(weak, criteria)
    }

    /// Register a control-change subscriber matched on channel and
    /// controller.
    pub fn register_controls(
        &self,
        subscriber: &Arc<impl ControlSink + 'static>,
        criteria: MidiControllerIdCriteria,
    ) -> SubscriberHandle {
        let weak = Arc::downgrade(subscriber);
        let weak: Weak<dyn ControlSink> = weak;
        self.controls.write().insert(weak, criteria)
    }

    /// Invalidate a note registration. Returns false for stale handles.
    pub fn unregister_notes(&self, handle: SubscriberHandle) -> bool {
        self.notes.write().remove(handle)
    }

    /// Invalidate a control registration. Returns false for stale handles.
    pub fn unregister_controls(&self, handle: SubscriberHandle) -> bool {
        self.controls.write().remove(handle)
    }

    /// Deliver a command to every matching live subscriber. No ordering is
    /// guaranteed between subscribers of the same event.
    pub fn dispatch(&self, command: MidiCommand) {
        match command {
            MidiCommand::NoteOn(channel, note) => {
                self.notes.write().for_each_live(
                    |criteria| criteria.matches_channel(channel),
                    |sink| sink.note_on(channel, note),
                );
            }
            MidiCommand::NoteOff(channel, note) => {
                self.notes.write().for_each_live(
                    |criteria| criteria.matches_channel(channel),
                    |sink| sink.note_off(channel, note),
                );
            }
            MidiCommand::ControlChange(id, value) => {
                self.controls.write().for_each_live(
                    |criteria| criteria.matches(id),
                    |sink| sink.control_changed(id, value),
                );
            }
        }
    }

    /// Live note subscriber count, mainly for tests and diagnostics.
    pub fn note_subscriber_count(&self) -> usize {
        self.notes.read().live_count()
    }

    /// Live control subscriber count.
    pub fn control_subscriber_count(&self) -> usize {
        self.controls.read().live_count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::midi::MidiValue;

    #[derive(Default)]
    struct CountingSink {
        ons: AtomicUsize,
        offs: AtomicUsize,
        controls: AtomicUsize,
    }

    impl NoteSink for CountingSink {
        fn note_on(&self, _channel: MidiChannel, _note: MidiNote) {
            self.ons.fetch_add(1, Ordering::SeqCst);
        }
        fn note_off(&self, _channel: MidiChannel, _note: MidiNote) {
            self.offs.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ControlSink for CountingSink {
        fn control_changed(&self, _id: MidiControllerId, _value: MidiValue) {
            self.controls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn note(number: u8) -> MidiNote {
        MidiNote {
            note: number,
            velocity: 100,
        }
    }

    #[test]
    fn notes_match_on_channel_with_wildcard() {
        let router = CommandRouter::new();
        let any = Arc::new(CountingSink::default());
        let ch2 = Arc::new(CountingSink::default());
        router.register_notes(&any, MidiControllerIdCriteria::default());
        router.register_notes(&ch2, MidiControllerIdCriteria::channel(2));

        router.dispatch(MidiCommand::NoteOn(0, note(60)));
        router.dispatch(MidiCommand::NoteOn(2, note(64)));

        assert_eq!(any.ons.load(Ordering::SeqCst), 2);
        assert_eq!(ch2.ons.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn controls_match_on_channel_and_controller() {
        let router = CommandRouter::new();
        let exact = Arc::new(CountingSink::default());
        let id = MidiControllerId {
            channel: 1,
            controller: 7,
        };
        router.register_controls(&exact, MidiControllerIdCriteria::exact(id));

        router.dispatch(MidiCommand::ControlChange(id, 64));
        router.dispatch(MidiCommand::ControlChange(
            MidiControllerId {
                channel: 1,
                controller: 8,
            },
            64,
        ));
        router.dispatch(MidiCommand::ControlChange(
            MidiControllerId {
                channel: 0,
                controller: 7,
            },
            64,
        ));

        assert_eq!(exact.controls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_subscribers_are_pruned_and_slots_reused() {
        let router = CommandRouter::new();
        let keeper = Arc::new(CountingSink::default());
        router.register_notes(&keeper, MidiControllerIdCriteria::default());
        {
            let transient = Arc::new(CountingSink::default());
            router.register_notes(&transient, MidiControllerIdCriteria::default());
            assert_eq!(router.note_subscriber_count(), 2);
        }
        // The dispatch both skips and reclaims the dead slot.
        router.dispatch(MidiCommand::NoteOn(0, note(60)));
        assert_eq!(router.note_subscriber_count(), 1);

        // A fresh registration reuses the freed slot with a new generation.
        let replacement = Arc::new(CountingSink::default());
        let handle = router.register_notes(&replacement, MidiControllerIdCriteria::default());
        assert_eq!(router.note_subscriber_count(), 2);
        assert!(router.unregister_notes(handle));
        assert!(!router.unregister_notes(handle), "stale handle must not remove twice");
    }

    #[test]
    fn unregistered_subscriber_is_not_delivered_to() {
        let router = CommandRouter::new();
        let sink = Arc::new(CountingSink::default());
        let handle = router.register_notes(&sink, MidiControllerIdCriteria::default());
        router.unregister_notes(handle);
        router.dispatch(MidiCommand::NoteOn(0, note(60)));
        assert_eq!(sink.ons.load(Ordering::SeqCst), 0);
    }
}
