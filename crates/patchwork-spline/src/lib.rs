#![warn(missing_docs)]

//! Bicubic Bezier and B-spline surfaces for the patchwork modeling kernel.
//!
//! A [`BicubicSurface`] references its control points by [`PointId`] and
//! resolves them from a [`PointStore`] into a [`BicubicGeometry`], which
//! implements [`patchwork_geom::Surface`]. The [`basis`] module holds the
//! shared curve arithmetic; [`SurfaceTemplate`] builds common layouts.
//!
//! [`PointId`]: patchwork_topo::PointId
//! [`PointStore`]: patchwork_topo::PointStore

pub mod basis;
mod curve;
mod error;
mod patch;
mod surface;
mod template;

pub use curve::{BSplineCurve, InterpolatingCurve};
pub use error::{Result, SurfaceError};
pub use patch::{evaluate_patch, PatchGrid, PatchKind, PatchOffset, PatchSample, SurfacePatch};
pub use surface::{default_topology, lattice_size, BicubicGeometry, BicubicSurface};
pub use template::{BuildMode, SurfaceTemplate, TEMPLATE_SPACING};
