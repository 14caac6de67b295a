//! Control-plane containers bridging typed configuration to render-plane
//! consumers.
//!
//! The one synchronization primitive in the crate lives here: the
//! [`pending::PendingCell`] single-writer/single-reader exchange. Everything
//! else in this module (range mapping, parameter state, observers) is plain
//! control-plane code that is allowed to allocate and lock.

pub mod pending;
pub mod range;
pub mod state;

pub use pending::{param_pair, ParamReader, ParamWriter, PendingCell};
pub use range::ParamRange;
pub use state::{ParamDecl, ParamKind, ParameterState};
