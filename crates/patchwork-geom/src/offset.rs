//! Normal-offset (equidistant) surface.

use patchwork_math::{Point2, Point3, Vec3};

use crate::{Surface, SurfaceKind};

/// A surface displaced along the unit normal of a base surface.
///
/// Derivatives are forwarded from the base surface unchanged, so they are
/// exact only where the base surface has zero curvature.
#[derive(Debug, Clone)]
pub struct OffsetSurface<S> {
    base: S,
    distance: f64,
}

impl<S: Surface> OffsetSurface<S> {
    /// Offset `base` by a signed `distance` along its normal.
    pub fn new(base: S, distance: f64) -> Self {
        Self { base, distance }
    }

    /// The underlying surface.
    pub fn base(&self) -> &S {
        &self.base
    }

    /// Signed offset distance.
    pub fn distance(&self) -> f64 {
        self.distance
    }
}

impl<S: Surface> Surface for OffsetSurface<S> {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.base.evaluate(uv) + self.base.normal(uv).into_inner() * self.distance
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        self.base.d_du(uv)
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        self.base.d_dv(uv)
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        self.base.domain()
    }

    fn is_u_wrapped(&self) -> bool {
        self.base.is_u_wrapped()
    }

    fn is_v_wrapped(&self) -> bool {
        self.base.is_v_wrapped()
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Offset
    }
}
