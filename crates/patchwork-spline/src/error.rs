//! Error types for bicubic surfaces.

use patchwork_topo::TopoError;
use thiserror::Error;

/// Structural validity errors raised while constructing a surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// A surface needs at least one patch in each direction.
    #[error("surface needs at least one patch per direction, got {patches_x}x{patches_y}")]
    ZeroPatches {
        /// Requested patches along u.
        patches_x: usize,
        /// Requested patches along v.
        patches_y: usize,
    },

    /// The control lattice does not match the patch counts.
    #[error("expected {expected} control points, got {actual}")]
    PointCount {
        /// Count implied by the patch layout.
        expected: usize,
        /// Count supplied.
        actual: usize,
    },

    /// The topology does not list sixteen indices per patch.
    #[error("expected {expected} topology indices, got {actual}")]
    TopologyLength {
        /// Count implied by the patch layout.
        expected: usize,
        /// Count supplied.
        actual: usize,
    },

    /// A topology entry points outside the control lattice.
    #[error("topology index {index} out of range for {len} control points")]
    TopologyIndex {
        /// Offending index.
        index: usize,
        /// Lattice size.
        len: usize,
    },

    /// Cylinder templates need enough columns to close the tube.
    #[error("cylinder needs at least 3 patches around, got {patches_x}")]
    CylinderTooNarrow {
        /// Requested patches along u.
        patches_x: usize,
    },

    /// A serialized patch references a point absent from the lattice.
    #[error("patch references a point that is not part of the surface")]
    ForeignPoint,

    /// Control-point bookkeeping failed.
    #[error(transparent)]
    Topo(#[from] TopoError),
}

/// Result type for surface construction.
pub type Result<T> = std::result::Result<T, SurfaceError>;
