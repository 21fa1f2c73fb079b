#![warn(missing_docs)]

//! Triangular gap detection and Gregory fill patches.
//!
//! [`find_gaps`] builds the corner/edge graph of a set of bicubic patches
//! and reports triangular holes at low-valence corners. [`GregoryFill`]
//! closes such a hole with three Gregory patches meeting at a shared
//! center point, matching the bounding patches' boundary tangents.

mod error;
mod graph;
mod gregory;

pub use error::{GapError, Result};
pub use graph::{find_gaps, SurfaceGap};
pub use gregory::{bisect_strip, indexing_for, reindex, GregoryFill, GregoryPatch, PatchIndexing};
