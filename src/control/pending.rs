//! The pending/committed hand-off cell.
//!
//! One writer on the control plane, one reader on the render plane. The
//! writer publishes a complete replacement value; the reader commits it at a
//! well-defined point before producing output. At most one pending value is
//! buffered: a second write before a commit supersedes the first.
//!
//! The cell is an `ArcSwapOption`: the stored pointer doubles as the dirty
//! flag, the release-store in `write` publishes the fully-written value, and
//! the acquire-swap in `take` is the only way the flag is consumed. The
//! render side never blocks and never allocates — the `Arc` it takes was
//! allocated by the control plane.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Single-slot, last-write-wins exchange between the two planes.
#[derive(Default)]
pub struct PendingCell<T> {
    slot: ArcSwapOption<T>,
}

impl<T> PendingCell<T> {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// Control-plane side: buffer `value` as the pending update. Replaces
    /// any previous pending value. Never blocks.
    pub fn write(&self, value: T) {
        self.slot.store(Some(Arc::new(value)));
    }

    /// Render-plane side: take the pending value if one was published.
    /// Lock-free; idempotent when clean.
    pub fn take(&self) -> Option<Arc<T>> {
        self.slot.swap(None)
    }

    /// Whether an uncommitted write is buffered.
    pub fn is_dirty(&self) -> bool {
        self.slot.load().is_some()
    }
}

/// Control-plane handle pushing values into one render-plane consumer.
/// Cloneable so a parameter state can be wired once and handed around.
pub struct ParamWriter<T> {
    cell: Arc<PendingCell<T>>,
}

impl<T> Clone for ParamWriter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> ParamWriter<T> {
    pub fn write(&self, value: T) {
        self.cell.write(value);
    }
}

/// Render-plane handle owning the committed value.
///
/// `commit` is the only place the committed value changes; callers invoke it
/// at the start of their render step and then read [`ParamReader::value`]
/// for the rest of the step.
pub struct ParamReader<T> {
    cell: Arc<PendingCell<T>>,
    committed: T,
}

impl<T: Clone> ParamReader<T> {
    /// Fold any pending write into the committed value. Returns true when a
    /// new value was applied.
    pub fn commit(&mut self) -> bool {
        match self.cell.take() {
            Some(pending) => {
                self.committed = (*pending).clone();
                true
            }
            None => false,
        }
    }

    pub fn value(&self) -> &T {
        &self.committed
    }

    /// Commit then read, for call sites that want one expression.
    pub fn latest(&mut self) -> &T {
        self.commit();
        &self.committed
    }
}

/// Build a connected writer/reader pair seeded with `initial`.
pub fn param_pair<T: Clone>(initial: T) -> (ParamWriter<T>, ParamReader<T>) {
    let cell = Arc::new(PendingCell::new());
    (
        ParamWriter {
            cell: Arc::clone(&cell),
        },
        ParamReader {
            cell,
            committed: initial,
        },
    )
}
