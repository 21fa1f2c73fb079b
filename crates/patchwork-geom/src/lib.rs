#![warn(missing_docs)]

//! Differentiable surfaces for the patchwork kernel.
//!
//! Every surface the intersection tracer, the milling baker or the debug
//! overlay can consume implements [`Surface`]: a rectangular parameter
//! domain, position and first partial derivatives, and per-direction
//! periodicity. The analytic torus and the normal-offset decorator live
//! here; bicubic patch surfaces implement the trait in `patchwork-spline`.

mod offset;
mod overlay;
mod torus;

pub use offset::OffsetSurface;
pub use overlay::{DerivativeOverlay, OverlayChannel, OverlaySegment, OverlaySettings};
pub use torus::TorusSurface;

use patchwork_math::{fit_param, Dir3, Point2, Point3, Vec3};
use std::sync::Arc;

// =============================================================================
// Surface types
// =============================================================================

/// The kind of a surface (for match-based dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Piecewise bicubic Bezier surface.
    Bezier,
    /// Piecewise uniform cubic B-spline surface.
    BSpline,
    /// Toroidal surface.
    Torus,
    /// Surface displaced along the normal of another surface.
    Offset,
}

/// A parametric surface with first derivatives.
pub trait Surface: Send + Sync + std::fmt::Debug {
    /// Evaluate the surface at parameter `(u, v)` to get a 3D point.
    fn evaluate(&self, uv: Point2) -> Point3;

    /// Partial derivative with respect to u at `(u, v)`.
    fn d_du(&self, uv: Point2) -> Vec3;

    /// Partial derivative with respect to v at `(u, v)`.
    fn d_dv(&self, uv: Point2) -> Vec3;

    /// Parameter domain as `((u_min, u_max), (v_min, v_max))`.
    fn domain(&self) -> ((f64, f64), (f64, f64));

    /// Whether parameters wrap around in u.
    fn is_u_wrapped(&self) -> bool;

    /// Whether parameters wrap around in v.
    fn is_v_wrapped(&self) -> bool;

    /// The kind of this surface.
    fn surface_type(&self) -> SurfaceKind;

    /// Unit normal `normalize(d_du × d_dv)`.
    ///
    /// A degenerate parameterization yields NaN components.
    fn normal(&self, uv: Point2) -> Dir3 {
        Dir3::new_normalize(self.d_du(uv).cross(&self.d_dv(uv)))
    }

    /// Map a parameter pair back into the domain, wrapping periodic
    /// directions and clamping the others.
    fn fit(&self, uv: Point2) -> Point2 {
        let ((u0, u1), (v0, v1)) = self.domain();
        Point2::new(
            fit_param(uv.x, u0, u1, self.is_u_wrapped()),
            fit_param(uv.y, v0, v1, self.is_v_wrapped()),
        )
    }

    /// Map a point of the unit square onto the parameter domain.
    fn from_unit(&self, s: Point2) -> Point2 {
        let ((u0, u1), (v0, v1)) = self.domain();
        Point2::new(u0 + s.x * (u1 - u0), v0 + s.y * (v1 - v0))
    }
}

macro_rules! forward_surface {
    ($ty:ty) => {
        impl<S: Surface + ?Sized> Surface for $ty {
            fn evaluate(&self, uv: Point2) -> Point3 {
                (**self).evaluate(uv)
            }
            fn d_du(&self, uv: Point2) -> Vec3 {
                (**self).d_du(uv)
            }
            fn d_dv(&self, uv: Point2) -> Vec3 {
                (**self).d_dv(uv)
            }
            fn domain(&self) -> ((f64, f64), (f64, f64)) {
                (**self).domain()
            }
            fn is_u_wrapped(&self) -> bool {
                (**self).is_u_wrapped()
            }
            fn is_v_wrapped(&self) -> bool {
                (**self).is_v_wrapped()
            }
            fn surface_type(&self) -> SurfaceKind {
                (**self).surface_type()
            }
            fn normal(&self, uv: Point2) -> Dir3 {
                (**self).normal(uv)
            }
        }
    };
}

forward_surface!(&S);
forward_surface!(Box<S>);
forward_surface!(Arc<S>);
