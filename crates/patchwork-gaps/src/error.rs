//! Error types for Gregory fill construction.

use thiserror::Error;

/// Errors raised while building a fill patch for a gap.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GapError {
    /// A gap references a patch index outside the supplied patch list.
    #[error("gap references patch {index} but only {count} patches were given")]
    PatchIndex {
        /// Referenced patch index.
        index: usize,
        /// Number of patches supplied.
        count: usize,
    },

    /// A gap vertex is not a corner of the patch that owns its edge.
    #[error("gap vertex is not a corner of patch {patch}")]
    NotACorner {
        /// Patch index.
        patch: usize,
    },

    /// The two gap vertices are diagonal corners of the patch.
    #[error("gap edge is a diagonal of patch {patch}")]
    NotAnEdge {
        /// Patch index.
        patch: usize,
    },

    /// A control point of a bounding patch no longer exists.
    #[error("patch {patch} references a missing control point")]
    MissingPoint {
        /// Patch index.
        patch: usize,
    },
}

/// Result type for gap filling.
pub type Result<T> = std::result::Result<T, GapError>;
