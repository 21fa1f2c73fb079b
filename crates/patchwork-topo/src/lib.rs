#![warn(missing_docs)]

//! Control points and change propagation for the patchwork kernel.
//!
//! Control points live in a single arena ([`PointStore`]) and are referenced
//! by stable [`PointId`] keys from every patch that uses them. A patch never
//! owns its points; a stale key is a normal, checkable condition.
//!
//! Derived geometry (fill patches, debug overlays) reacts to changes through
//! an [`EventBus`]: sources publish events, dependents are queued once per
//! event kind, and the owner drains the queue once per frame.

mod error;
mod events;
mod points;

pub use error::{Result, TopoError};
pub use events::{EventBus, EventKind};
pub use points::{ControlPoint, PointId, PointStore};
