//! Generic control-plane parameter container.
//!
//! A [`ParameterState`] owns the typed, control-side view of one logical
//! parameter: how raw 7-bit values map into the semantic type, the last
//! mapped value (for observers and UI read-back), the set of render-plane
//! targets its committed values are pushed to, and a broadcast channel of
//! value changes.
//!
//! Writes never touch render state directly: they go through each target's
//! [`ParamWriter`], and the owning node commits them on its next render
//! tick. The inverse mapping is observer-only and never feeds back.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use super::pending::ParamWriter;
use super::range::ParamRange;
use crate::error::ConfigError;
use crate::midi::{ControlSink, MidiControllerId, MidiControllerIdCriteria, MidiValue};

/// How a parameter's raw values are interpreted, as declared to UI
/// collaborators that need to render a control for it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Linear sweep over a half-open range.
    Numeric(ParamRange),
    /// Selection among `count` variants, mapped as `raw mod count`.
    Enumerated { count: usize },
}

/// Static declaration of one parameter: stable id, the commands it listens
/// to, and the shape of its value space.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub id: String,
    pub criteria: MidiControllerIdCriteria,
    pub kind: ParamKind,
}

impl ParamDecl {
    pub fn numeric(
        id: impl Into<String>,
        criteria: MidiControllerIdCriteria,
        range: ParamRange,
    ) -> Self {
        Self {
            id: id.into(),
            criteria,
            kind: ParamKind::Numeric(range),
        }
    }

    pub fn enumerated(
        id: impl Into<String>,
        criteria: MidiControllerIdCriteria,
        count: usize,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        if count == 0 {
            return Err(ConfigError::EmptyEnumeration { id });
        }
        Ok(Self {
            id,
            criteria,
            kind: ParamKind::Enumerated { count },
        })
    }
}

type MapFn<V> = dyn Fn(MidiControllerId, MidiValue, &V) -> Option<V> + Send + Sync;

/// Control-plane state for one parameter of semantic type `V`.
///
/// The mapping closure sees the controller identity, the raw value, and the
/// current value, and returns the replacement — read-modify-write, so one
/// state can fold several physical controllers into one composite value
/// (the four ADSR knobs, the per-source mixer weights). Returning `None`
/// ignores the event.
pub struct ParameterState<V> {
    decl: ParamDecl,
    map: Box<MapFn<V>>,
    current: Mutex<V>,
    targets: Mutex<Vec<ParamWriter<V>>>,
    observers: Mutex<Vec<Sender<V>>>,
}

impl<V: Clone> ParameterState<V> {
    pub fn new(
        decl: ParamDecl,
        initial: V,
        map: impl Fn(MidiControllerId, MidiValue, &V) -> Option<V> + Send + Sync + 'static,
    ) -> Self {
        Self {
            decl,
            map: Box::new(map),
            current: Mutex::new(initial),
            targets: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn decl(&self) -> &ParamDecl {
        &self.decl
    }

    /// Wire one render-plane consumer. Composition-time only.
    pub fn attach(&self, target: ParamWriter<V>) {
        self.targets.lock().push(target);
    }

    /// Read-only stream of mapped values, for UI and observability. A
    /// dropped receiver is detached on the next write.
    pub fn subscribe(&self) -> Receiver<V> {
        let (tx, rx) = unbounded();
        self.observers.lock().push(tx);
        rx
    }

    /// Snapshot of the last mapped value.
    pub fn current(&self) -> V {
        self.current.lock().clone()
    }

    /// Map a raw control value and push the result to every target and
    /// observer. No-op when the mapping declines the event.
    pub fn write(&self, id: MidiControllerId, raw: MidiValue) {
        let mut current = self.current.lock();
        let Some(next) = (self.map)(id, raw, &current) else {
            return;
        };
        for target in self.targets.lock().iter() {
            target.write(next.clone());
        }
        self.observers
            .lock()
            .retain(|tx| tx.send(next.clone()).is_ok());
        *current = next;
    }
}

impl ParameterState<f32> {
    /// Single-controller numeric parameter over `range`.
    pub fn numeric(
        id: impl Into<String>,
        criteria: MidiControllerIdCriteria,
        range: ParamRange,
        initial: f32,
    ) -> Self {
        Self::new(
            ParamDecl::numeric(id, criteria, range),
            initial,
            move |_, raw, _| Some(range.value_from_midi(raw)),
        )
    }

    /// Observer-side read-back of the current value as a raw control value.
    pub fn current_as_midi(&self) -> Option<MidiValue> {
        match self.decl.kind {
            ParamKind::Numeric(range) => Some(range.value_to_midi(self.current())),
            ParamKind::Enumerated { .. } => None,
        }
    }
}

impl ParameterState<usize> {
    /// Enumerated selection parameter: `raw mod count`.
    pub fn enumerated(
        id: impl Into<String>,
        criteria: MidiControllerIdCriteria,
        count: usize,
        initial: usize,
    ) -> Result<Self, ConfigError> {
        let decl = ParamDecl::enumerated(id, criteria, count)?;
        Ok(Self::new(decl, initial, move |_, raw, _| {
            Some(raw as usize % count)
        }))
    }
}

impl<V: Clone + Send + Sync> ControlSink for ParameterState<V> {
    fn control_changed(&self, id: MidiControllerId, value: MidiValue) {
        if self.decl.criteria.matches(id) {
            self.write(id, value);
        }
    }
}
