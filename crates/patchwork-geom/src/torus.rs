//! Analytic torus.

use std::f64::consts::PI;

use patchwork_math::{Dir3, Point2, Point3, Transform, Vec3};

use crate::{Surface, SurfaceKind};

/// A torus around an axis, periodic in both parameters.
///
/// `u` runs around the axis, `v` around the tube; both span `[0, 2π)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TorusSurface {
    /// Center of the torus.
    pub center: Point3,
    /// Unit direction of the torus axis.
    pub axis: Dir3,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Distance from center to tube center.
    pub major_radius: f64,
    /// Radius of the tube.
    pub minor_radius: f64,
}

impl TorusSurface {
    /// Create a torus centered at origin with axis along Z.
    pub fn new(major_radius: f64, minor_radius: f64) -> Self {
        Self {
            center: Point3::origin(),
            axis: Dir3::new_normalize(Vec3::z()),
            ref_dir: Dir3::new_normalize(Vec3::x()),
            major_radius,
            minor_radius,
        }
    }

    /// Create a torus with a custom center and axis.
    pub fn with_axis(center: Point3, axis: Vec3, major_radius: f64, minor_radius: f64) -> Self {
        let a = Dir3::new_normalize(axis);
        let arbitrary = if a.as_ref().x.abs() < 0.9 {
            Vec3::x()
        } else {
            Vec3::y()
        };
        let ref_dir = Dir3::new_normalize(arbitrary - arbitrary.dot(a.as_ref()) * a.as_ref());
        Self {
            center,
            axis: a,
            ref_dir,
            major_radius,
            minor_radius,
        }
    }

    /// Apply an affine transform, scaling both radii by the transformed
    /// length of the reference direction.
    pub fn transform(&self, t: &Transform) -> Self {
        let new_ref = t.apply_vec(self.ref_dir.as_ref());
        let scale = new_ref.norm();
        Self {
            center: t.apply_point(&self.center),
            axis: Dir3::new_normalize(t.apply_vec(self.axis.as_ref())),
            ref_dir: Dir3::new_normalize(new_ref),
            major_radius: self.major_radius * scale,
            minor_radius: self.minor_radius * scale,
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }

    fn tube_dir(&self, u: f64) -> Vec3 {
        let (sin_u, cos_u) = u.sin_cos();
        cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir()
    }
}

impl Surface for TorusSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (sin_v, cos_v) = uv.y.sin_cos();
        self.center
            + (self.major_radius + self.minor_radius * cos_v) * self.tube_dir(uv.x)
            + self.minor_radius * sin_v * self.axis.as_ref()
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let cos_v = uv.y.cos();
        let d_tube = -sin_u * self.ref_dir.as_ref() + cos_u * self.y_dir();
        (self.major_radius + self.minor_radius * cos_v) * d_tube
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        let (sin_v, cos_v) = uv.y.sin_cos();
        -self.minor_radius * sin_v * self.tube_dir(uv.x) + self.minor_radius * cos_v * self.axis.as_ref()
    }

    fn normal(&self, uv: Point2) -> Dir3 {
        // Outward from the tube center; stays defined where R + r cos v = 0.
        let (sin_v, cos_v) = uv.y.sin_cos();
        Dir3::new_normalize(cos_v * self.tube_dir(uv.x) + sin_v * self.axis.as_ref())
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((0.0, 2.0 * PI), (0.0, 2.0 * PI))
    }

    fn is_u_wrapped(&self) -> bool {
        true
    }

    fn is_v_wrapped(&self) -> bool {
        true
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Torus
    }
}
