//! Cubic curves: uniform B-splines and natural interpolating splines.

use patchwork_math::{Point3, Vec3};

use crate::basis::{bspline_derivative, bspline_point, bspline_to_bezier, decasteljau, decasteljau_derivative};

/// Map a global parameter in `[0, 1]` onto `(segment, local)`.
fn locate(t: f64, segments: usize) -> (usize, f64) {
    let s = t.clamp(0.0, 1.0) * segments as f64;
    let index = (s.floor() as usize).min(segments - 1);
    (index, s - index as f64)
}

// =============================================================================
// B-spline curve
// =============================================================================

/// Uniform cubic B-spline curve over its de Boor points.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    points: Vec<Point3>,
}

impl BSplineCurve {
    /// Curve over `points`; `None` with fewer than four de Boor points.
    pub fn new(points: Vec<Point3>) -> Option<Self> {
        (points.len() >= 4).then_some(Self { points })
    }

    /// De Boor points.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Number of cubic segments.
    pub fn segment_count(&self) -> usize {
        self.points.len() - 3
    }

    fn window(&self, index: usize) -> [Point3; 4] {
        [
            self.points[index],
            self.points[index + 1],
            self.points[index + 2],
            self.points[index + 3],
        ]
    }

    /// Point at global `t ∈ [0, 1]`.
    pub fn evaluate(&self, t: f64) -> Point3 {
        let (index, local) = locate(t, self.segment_count());
        bspline_point(&self.window(index), local)
    }

    /// Derivative with respect to global `t`.
    pub fn derivative(&self, t: f64) -> Vec3 {
        let segments = self.segment_count();
        let (index, local) = locate(t, segments);
        bspline_derivative(&self.window(index), local) * segments as f64
    }

    /// Equivalent piecewise Bezier control polygons, one per segment.
    pub fn to_bezier(&self) -> Vec<[Point3; 4]> {
        (0..self.segment_count())
            .map(|i| bspline_to_bezier(&self.window(i)))
            .collect()
    }
}

// =============================================================================
// Interpolating curve
// =============================================================================

/// Natural C2 cubic spline through a point sequence.
///
/// Knots are uniform; each span is stored as a Bernstein control polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatingCurve {
    segments: Vec<[Point3; 4]>,
}

impl InterpolatingCurve {
    /// Interpolate `points`; `None` with fewer than two points.
    pub fn through(points: &[Point3]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let spans = points.len() - 1;

        // Second-derivative coefficients c_1..c_{N-1}; c_0 = c_N = 0.
        let mut c = vec![Vec3::zeros(); spans + 1];
        let unknowns = spans - 1;
        if unknowns > 0 {
            let rhs: Vec<Vec3> = (1..spans)
                .map(|i| (points[i + 1] - points[i] * 2.0 + points[i - 1].coords) * 1.5)
                .collect();
            let solved = solve_tridiagonal(0.5, 2.0, 0.5, &rhs);
            c[1..spans].copy_from_slice(&solved);
        }

        let segments = (0..spans)
            .map(|i| {
                let a0 = points[i];
                let a2 = c[i];
                let a3 = (c[i + 1] - c[i]) / 3.0;
                let a1 = (points[i + 1] - points[i]) - a2 - a3;
                [
                    a0,
                    a0 + a1 / 3.0,
                    a0 + a1 * (2.0 / 3.0) + a2 / 3.0,
                    a0 + a1 + a2 + a3,
                ]
            })
            .collect();
        Some(Self { segments })
    }

    /// Bernstein control polygons, one per span.
    pub fn segments(&self) -> &[[Point3; 4]] {
        &self.segments
    }

    /// Point at global `t ∈ [0, 1]`; span `i` covers `[i/N, (i+1)/N]`.
    pub fn evaluate(&self, t: f64) -> Point3 {
        let (index, local) = locate(t, self.segments.len());
        decasteljau(&self.segments[index], local)
    }

    /// Derivative with respect to global `t`.
    pub fn derivative(&self, t: f64) -> Vec3 {
        let spans = self.segments.len();
        let (index, local) = locate(t, spans);
        decasteljau_derivative(&self.segments[index], local) * spans as f64
    }
}

/// Thomas algorithm for a constant-coefficient tridiagonal system.
fn solve_tridiagonal(sub: f64, diag: f64, sup: f64, rhs: &[Vec3]) -> Vec<Vec3> {
    let n = rhs.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![Vec3::zeros(); n];

    c_prime[0] = sup / diag;
    d_prime[0] = rhs[0] / diag;
    for i in 1..n {
        let m = diag - sub * c_prime[i - 1];
        c_prime[i] = sup / m;
        d_prime[i] = (rhs[i] - d_prime[i - 1] * sub) / m;
    }

    let mut x = vec![Vec3::zeros(); n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - x[i + 1] * c_prime[i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn zigzag() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(2.0, -1.0, 0.5),
            Point3::new(3.0, 0.5, 1.0),
            Point3::new(4.5, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_interpolating_curve_passes_through_points() {
        let points = zigzag();
        let curve = InterpolatingCurve::through(&points).unwrap();
        let spans = points.len() - 1;
        assert_eq!(curve.segments().len(), spans);
        for (i, p) in points.iter().enumerate() {
            let q = curve.evaluate(i as f64 / spans as f64);
            assert!((q - p).norm() < 1e-12, "point {i}");
        }
    }

    #[test]
    fn test_interpolating_curve_is_c2_at_knots() {
        let curve = InterpolatingCurve::through(&zigzag()).unwrap();
        let segs = curve.segments();
        for w in segs.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            assert!((a[3] - b[0]).norm() < 1e-12);
            assert!(((a[3] - a[2]) - (b[1] - b[0])).norm() < 1e-12);
            let second_a = a[3] - a[2] * 2.0 + a[1].coords;
            let second_b = b[2] - b[1] * 2.0 + b[0].coords;
            assert!((second_a - second_b).norm() < 1e-12);
        }
        // Natural end conditions.
        let first = segs[0];
        assert!((first[2] - first[1] * 2.0 + first[0].coords).norm() < 1e-12);
    }

    #[test]
    fn test_two_points_make_a_line() {
        let curve = InterpolatingCurve::through(&[Point3::origin(), Point3::new(3.0, 0.0, 0.0)]).unwrap();
        let mid = curve.evaluate(0.5);
        assert_relative_eq!(mid.x, 1.5, epsilon = 1e-12);
        assert!(InterpolatingCurve::through(&[Point3::origin()]).is_none());
    }

    #[test]
    fn test_bspline_curve_matches_bezier_form() {
        let curve = BSplineCurve::new(zigzag()).unwrap();
        let beziers = curve.to_bezier();
        assert_eq!(beziers.len(), 2);
        for (i, bezier) in beziers.iter().enumerate() {
            for k in 0..=4 {
                let local = k as f64 / 4.0;
                let global = (i as f64 + local) / 2.0;
                assert!((curve.evaluate(global) - decasteljau(bezier, local)).norm() < 1e-12);
            }
        }
        assert!(BSplineCurve::new(zigzag()[..3].to_vec()).is_none());
    }

    #[test]
    fn test_curve_derivative_finite_difference() {
        let curve = InterpolatingCurve::through(&zigzag()).unwrap();
        let h = 1e-6;
        for t in [0.1, 0.33, 0.6, 0.9] {
            let fd = (curve.evaluate(t + h) - curve.evaluate(t - h)) / (2.0 * h);
            assert!((curve.derivative(t) - fd).norm() < 1e-4);
        }
    }
}
