#![warn(missing_docs)]

//! Math types for the patchwork modeling kernel.
//!
//! Aliases over nalgebra for the types every other crate shares, the
//! affine [`Transform`] that moves control points and tori, periodic and
//! clamped parameter fitting, and the 4×4 solver behind the marching
//! corrector.

use nalgebra::{Matrix4, Rotation3, Unit, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 4-component vector, used for the `(u, v, p, q)` state of two surfaces.
pub type Vec4 = Vector4<f64>;

/// A dense 4x4 matrix.
pub type Mat4 = Matrix4<f64>;

// =============================================================================
// Transforms
// =============================================================================

/// Affine map applied to control points and tori.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Homogeneous matrix; the bottom row stays `[0, 0, 0, 1]`.
    pub matrix: Mat4,
}

impl Transform {
    /// Leaves everything in place.
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::identity(),
        }
    }

    /// Shift by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            matrix: Mat4::new_translation(&Vec3::new(dx, dy, dz)),
        }
    }

    /// Per-axis scale about the origin.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            matrix: Mat4::new_nonuniform_scaling(&Vec3::new(sx, sy, sz)),
        }
    }

    /// Right-handed rotation by `angle` radians about `axis` through the origin.
    pub fn rotation(axis: &Dir3, angle: f64) -> Self {
        Self {
            matrix: Rotation3::from_axis_angle(axis, angle).to_homogeneous(),
        }
    }

    /// The same map acting around `pivot` instead of the origin.
    pub fn about(&self, pivot: &Point3) -> Self {
        Self::translation(pivot.x, pivot.y, pivot.z)
            .then(self)
            .then(&Self::translation(-pivot.x, -pivot.y, -pivot.z))
    }

    /// Matrix product `self * other`: `other` applies first.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Map a position.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.matrix.transform_point(p)
    }

    /// Map a direction; translation does not apply.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.matrix.transform_vector(v)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

// =============================================================================
// Parameter domains
// =============================================================================

/// Wrap `x` into the half-open range `[min, max)`.
///
/// NaN stays NaN.
pub fn wrap_param(x: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span <= 0.0 {
        return min;
    }
    let wrapped = min + (x - min).rem_euclid(span);
    // rem_euclid can round up to exactly `span` for tiny negative inputs
    if wrapped >= max {
        min
    } else {
        wrapped
    }
}

/// Clamp `x` into the closed range `[min, max]`.
pub fn clamp_param(x: f64, min: f64, max: f64) -> f64 {
    x.clamp(min, max)
}

/// Wrap or clamp `x` into `[min, max]` depending on periodicity.
pub fn fit_param(x: f64, min: f64, max: f64, wrapped: bool) -> f64 {
    if wrapped {
        wrap_param(x, min, max)
    } else {
        clamp_param(x, min, max)
    }
}

// =============================================================================
// Linear solve
// =============================================================================

/// Solve `A x = b` for a 4x4 system by Gaussian elimination with partial
/// pivoting.
///
/// A singular matrix is not detected: the zero pivot divides through and
/// the result carries NaN or infinity.
pub fn solve4(a: &Mat4, b: &Vec4) -> Vec4 {
    let mut m = *a;
    let mut c = *b;

    for k in 0..4 {
        let mut pivot = k;
        let mut pivot_val = 0.0;
        for i in k..4 {
            let v = m[(i, k)].abs();
            if v > pivot_val {
                pivot = i;
                pivot_val = v;
            }
        }

        if pivot != k {
            m.swap_rows(pivot, k);
            c.swap_rows(pivot, k);
        }

        for i in (k + 1)..4 {
            let factor = m[(i, k)] / m[(k, k)];
            for j in k..4 {
                m[(i, j)] -= factor * m[(k, j)];
            }
            c[i] -= factor * c[k];
        }
    }

    let mut x = Vec4::zeros();
    for k in (0..4).rev() {
        let mut sum = c[k];
        for j in (k + 1)..4 {
            sum -= m[(k, j)] * x[j];
        }
        x[k] = sum / m[(k, k)];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_translation() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let moved = t.apply_point(&Point3::new(1.0, 2.0, 3.0));
        assert!((moved - Point3::new(11.0, 22.0, 33.0)).norm() < 1e-12);
        assert_eq!(t.apply_vec(&Vec3::x()), Vec3::x());
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let t = Transform::rotation(&Dir3::new_normalize(Vec3::y()), PI / 2.0);
        let p = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p - Point3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_about_keeps_pivot() {
        let pivot = Point3::new(1.0, 2.0, 3.0);
        let t = Transform::scale(2.0, 2.0, 2.0).about(&pivot);
        assert!((t.apply_point(&pivot) - pivot).norm() < 1e-12);
        let moved = t.apply_point(&Point3::new(2.0, 2.0, 3.0));
        assert!((moved - Point3::new(3.0, 2.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn test_then_applies_right_operand_first() {
        let shift = Transform::translation(1.0, 0.0, 0.0);
        let double = Transform::scale(2.0, 2.0, 2.0);
        let p = shift.then(&double).apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 3.0).abs() < 1e-12);
        let q = double.then(&shift).apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((q.x - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_param() {
        assert!((wrap_param(1.25, 0.0, 1.0) - 0.25).abs() < 1e-12);
        assert!((wrap_param(-0.25, 0.0, 1.0) - 0.75).abs() < 1e-12);
        assert_eq!(wrap_param(1.0, 0.0, 1.0), 0.0);
        assert!((wrap_param(7.0, 0.0, 2.0 * PI) - (7.0 - 2.0 * PI)).abs() < 1e-12);
        assert!(wrap_param(f64::NAN, 0.0, 1.0).is_nan());
    }

    #[test]
    fn test_fit_param_clamps_when_not_wrapped() {
        assert_eq!(fit_param(1.5, 0.0, 1.0, false), 1.0);
        assert_eq!(fit_param(-0.5, 0.0, 1.0, false), 0.0);
        assert!((fit_param(1.5, 0.0, 1.0, true) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_solve4_needs_pivoting() {
        // Zero on the leading diagonal forces a row swap.
        let a = Mat4::new(
            0.0, 2.0, 0.0, 1.0, //
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 3.0, 0.0, //
            0.0, 1.0, 0.0, 4.0,
        );
        let expected = Vec4::new(1.0, -2.0, 0.5, 3.0);
        let b = a * expected;
        let x = solve4(&a, &b);
        assert!((x - expected).norm() < 1e-12);
    }

    #[test]
    fn test_solve4_singular_propagates_non_finite() {
        let a = Mat4::zeros();
        let x = solve4(&a, &Vec4::new(1.0, 0.0, 0.0, 0.0));
        assert!(x.iter().any(|v| !v.is_finite()));
    }
}
