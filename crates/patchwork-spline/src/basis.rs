//! Cubic basis functions shared by curves and surfaces.
//!
//! Bezier segments are evaluated by de Casteljau reduction; uniform cubic
//! B-spline segments by the Cox–de Boor recursion unrolled for integer
//! knots, with the local parameter `t ∈ [0, 1]` spanning one knot interval.

use patchwork_math::{Point3, Vec3};

/// Cubic Bernstein weights at `t`.
pub fn bernstein3(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

/// Quadratic Bernstein weights at `t`.
pub fn bernstein2(t: f64) -> [f64; 3] {
    let s = 1.0 - t;
    [s * s, 2.0 * t * s, t * t]
}

/// Uniform B-spline basis values on one knot interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BSplineBasis {
    /// Degree-3 values `N30..N33`.
    pub cubic: [f64; 4],
    /// Degree-2 values `N20..N22`, used for derivatives.
    pub quadratic: [f64; 3],
}

/// Evaluate the uniform cubic B-spline basis at local parameter `t`.
///
/// Level `k`, function `j` follows
/// `N[k][j] = ((t + k - j) * N[k-1][j-1] + (j + 1 - t) * N[k-1][j]) / k`
/// with out-of-range terms dropped.
pub fn bspline3(t: f64) -> BSplineBasis {
    let n10 = 1.0 - t;
    let n11 = t;

    let n20 = (1.0 - t) * n10 / 2.0;
    let n21 = ((t + 1.0) * n10 + (2.0 - t) * n11) / 2.0;
    let n22 = t * n11 / 2.0;

    let n30 = (1.0 - t) * n20 / 3.0;
    let n31 = ((t + 2.0) * n20 + (2.0 - t) * n21) / 3.0;
    let n32 = ((t + 1.0) * n21 + (3.0 - t) * n22) / 3.0;
    let n33 = t * n22 / 3.0;

    BSplineBasis {
        cubic: [n30, n31, n32, n33],
        quadratic: [n20, n21, n22],
    }
}

fn lerp(a: &Point3, b: &Point3, t: f64) -> Point3 {
    a + (b - a) * t
}

/// Evaluate a cubic Bezier segment by de Casteljau reduction.
pub fn decasteljau(p: &[Point3; 4], t: f64) -> Point3 {
    let a = lerp(&p[0], &p[1], t);
    let b = lerp(&p[1], &p[2], t);
    let c = lerp(&p[2], &p[3], t);
    let d = lerp(&a, &b, t);
    let e = lerp(&b, &c, t);
    lerp(&d, &e, t)
}

/// Derivative of a cubic Bezier segment: `3 · B'(t)` where `B'` is the
/// quadratic segment over the forward differences.
pub fn decasteljau_derivative(p: &[Point3; 4], t: f64) -> Vec3 {
    let d0 = p[1] - p[0];
    let d1 = p[2] - p[1];
    let d2 = p[3] - p[2];
    let a = d0.lerp(&d1, t);
    let b = d1.lerp(&d2, t);
    3.0 * a.lerp(&b, t)
}

/// Split a cubic Bezier segment at `t = 0.5`.
///
/// The first half runs from `p[0]` to the midpoint, the second from the
/// midpoint to `p[3]`.
pub fn bisect(p: &[Point3; 4]) -> ([Point3; 4], [Point3; 4]) {
    let b10 = lerp(&p[0], &p[1], 0.5);
    let b11 = lerp(&p[1], &p[2], 0.5);
    let b12 = lerp(&p[2], &p[3], 0.5);
    let b20 = lerp(&b10, &b11, 0.5);
    let b21 = lerp(&b11, &b12, 0.5);
    let b30 = lerp(&b20, &b21, 0.5);
    ([p[0], b10, b20, b30], [b30, b21, b12, p[3]])
}

/// Evaluate a uniform cubic B-spline segment.
pub fn bspline_point(p: &[Point3; 4], t: f64) -> Point3 {
    let n = bspline3(t).cubic;
    Point3::from(p[0].coords * n[0] + p[1].coords * n[1] + p[2].coords * n[2] + p[3].coords * n[3])
}

/// Derivative of a uniform cubic B-spline segment from the degree-2 basis.
pub fn bspline_derivative(p: &[Point3; 4], t: f64) -> Vec3 {
    let n = bspline3(t).quadratic;
    (p[1] - p[0]) * n[0] + (p[2] - p[1]) * n[1] + (p[3] - p[2]) * n[2]
}

/// Convert one uniform B-spline segment to its Bezier control points.
pub fn bspline_to_bezier(p: &[Point3; 4]) -> [Point3; 4] {
    let c = |w: [f64; 4]| {
        Point3::from(p[0].coords * w[0] + p[1].coords * w[1] + p[2].coords * w[2] + p[3].coords * w[3])
    };
    [
        c([1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0, 0.0]),
        c([0.0, 2.0 / 3.0, 1.0 / 3.0, 0.0]),
        c([0.0, 1.0 / 3.0, 2.0 / 3.0, 0.0]),
        c([0.0, 1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0]),
    ]
}
