#![warn(missing_docs)]

//! Scene-level operations for the patchwork curve and surface kernel.
//!
//! A [`Document`] owns named objects, the shared control points and the
//! selection. Editing publishes events; [`Document::integrate`] rebuilds
//! surfaces, gap fills and overlays that depend on what changed.
//!
//! # Example
//!
//! ```
//! use patchwork::{Document, Shape};
//!
//! let mut doc = Document::new();
//! let base = doc.prepare_milling_base().unwrap();
//! assert!(matches!(doc.get(base).unwrap().shape, Shape::Surface(_)));
//! assert_eq!(doc.points().len(), 16);
//! ```

pub use patchwork_gaps;
pub use patchwork_geom;
pub use patchwork_intersect;
pub use patchwork_math;
pub use patchwork_mill;
pub use patchwork_spline;
pub use patchwork_topo;
pub use patchwork_trim;

mod config;
mod document;
mod error;

pub use config::Settings;
pub use document::{
    CurveObject, Document, GregoryObject, Object, ObjectId, OverlayObject, PatchSurface, Shape, Source,
    TorusObject,
};
pub use error::{DocumentError, Result};
