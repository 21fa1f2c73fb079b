//! Error types for control-point bookkeeping.

use crate::PointId;
use thiserror::Error;

/// Errors raised by the control-point arena.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopoError {
    /// The id does not refer to a live point.
    #[error("unknown control point {0:?}")]
    UnknownPoint(PointId),

    /// The point is still referenced by a surface and cannot be removed.
    #[error("control point {0:?} is in use by a surface")]
    PointInUse(PointId),
}

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopoError>;
