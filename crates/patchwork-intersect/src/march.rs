//! Newton marching along an intersection curve.

use patchwork_geom::Surface;
use patchwork_math::{solve4, Mat4, Point2, Point3, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::SeedOutcome;

/// Parameters of the curve follower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarchSettings {
    /// Distance advanced along the tangent per outer step.
    pub step: f64,
    /// Fraction of each Newton correction applied.
    pub damping: f64,
    /// Newton iterations per outer step.
    pub max_newton: usize,
    /// Residual norm at which Newton stops early.
    pub tolerance: f64,
    /// Outer steps per direction.
    pub steps: usize,
}

impl Default for MarchSettings {
    fn default() -> Self {
        Self {
            step: 0.01,
            damping: 0.05,
            max_newton: 50,
            tolerance: 1e-4,
            steps: 1000,
        }
    }
}

/// Marching direction relative to `n1 × n2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Along the tangent.
    Forward,
    /// Against the tangent.
    Backward,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

/// One directional trace, starting with the seed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntersectionCurve {
    /// Parameters on the first surface.
    pub params1: Vec<Point2>,
    /// Parameters on the second surface.
    pub params2: Vec<Point2>,
    /// Points on the first surface.
    pub points: Vec<Point3>,
    /// Points on the second surface.
    pub points2: Vec<Point3>,
}

impl IntersectionCurve {
    fn push(&mut self, a: Point2, b: Point2, pa: Point3, pb: Point3) {
        self.params1.push(a);
        self.params2.push(b);
        self.points.push(pa);
        self.points2.push(pb);
    }

    /// Number of traced points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing was traced.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest distance between matching samples of the two surfaces.
    pub fn max_gap(&self) -> f64 {
        self.points
            .iter()
            .zip(&self.points2)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }
}

/// Follow the intersection from `seed` for a fixed number of steps.
///
/// Each step solves `S1(u, v) = S2(p, q)` together with
/// `(S1(u, v) - P0) · t = step`, where `P0` is the previous point and `t`
/// the unit tangent `±normalize(n1 × n2)` there. Non-finite values are
/// carried through rather than stopping the trace.
pub fn march<A, B>(s1: &A, s2: &B, seed: &SeedOutcome, direction: Direction, settings: &MarchSettings) -> IntersectionCurve
where
    A: Surface + ?Sized,
    B: Surface + ?Sized,
{
    let mut curve = IntersectionCurve::default();
    let mut a = seed.params1;
    let mut b = seed.params2;
    let mut anchor = s1.evaluate(a);
    curve.push(a, b, anchor, s2.evaluate(b));

    for _ in 0..settings.steps {
        let tangent = direction.sign() * s1.normal(a).cross(&s2.normal(b)).normalize();
        let mut x = Vec4::new(a.x, a.y, b.x, b.y);

        for _ in 0..settings.max_newton {
            let (pa, pb) = (Point2::new(x[0], x[1]), Point2::new(x[2], x[3]));
            let p = s1.evaluate(pa);
            let q = s2.evaluate(pb);
            let diff = p - q;
            let f = Vec4::new(diff.x, diff.y, diff.z, (p - anchor).dot(&tangent) - settings.step);
            if f.norm() < settings.tolerance {
                break;
            }

            let jacobian = jacobian(s1.d_du(pa), s1.d_dv(pa), s2.d_du(pb), s2.d_dv(pb), &tangent);
            let delta = solve4(&jacobian, &(-f));
            x += settings.damping * delta;

            let fa = s1.fit(Point2::new(x[0], x[1]));
            let fb = s2.fit(Point2::new(x[2], x[3]));
            x = Vec4::new(fa.x, fa.y, fb.x, fb.y);
        }

        a = Point2::new(x[0], x[1]);
        b = Point2::new(x[2], x[3]);
        anchor = s1.evaluate(a);
        curve.push(a, b, anchor, s2.evaluate(b));
    }

    if curve.points.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
        warn!(?direction, "intersection march produced non-finite points");
    }
    debug!(?direction, points = curve.len(), max_gap = curve.max_gap(), "march finished");
    curve
}

/// Jacobian of `[S1 - S2; (S1 - P0) · t - d]` with respect to `(u, v, p, q)`.
fn jacobian(dpdu: Vec3, dpdv: Vec3, dqdp: Vec3, dqdq: Vec3, t: &Vec3) -> Mat4 {
    Mat4::new(
        dpdu.x, dpdv.x, -dqdp.x, -dqdq.x, //
        dpdu.y, dpdv.y, -dqdp.y, -dqdq.y, //
        dpdu.z, dpdv.z, -dqdp.z, -dqdq.z, //
        t.dot(&dpdu), t.dot(&dpdv), 0.0, 0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::plane;
    use crate::{seed, SeedSettings};
    use patchwork_geom::TorusSurface;

    fn plane_torus_seed() -> (patchwork_spline::BicubicGeometry, TorusSurface, SeedOutcome) {
        let plane = plane();
        let torus = TorusSurface::new(1.0, 0.4);
        let s = seed(&plane, &torus, &SeedSettings::default(), None).unwrap();
        (plane, torus, s)
    }

    #[test]
    fn test_march_stays_on_both_surfaces() {
        let (plane, torus, s) = plane_torus_seed();
        let curve = march(&plane, &torus, &s, Direction::Forward, &MarchSettings::default());
        assert_eq!(curve.len(), 1001);
        assert!(curve.max_gap() < 1e-2);
        for p in &curve.points {
            assert!(p.z.abs() < 1e-9);
        }
        for q in &curve.points2 {
            assert!(q.z.abs() < 1e-2);
        }
    }

    #[test]
    fn test_march_advances_along_curve() {
        let (plane, torus, s) = plane_torus_seed();
        let settings = MarchSettings {
            steps: 50,
            ..MarchSettings::default()
        };
        let forward = march(&plane, &torus, &s, Direction::Forward, &settings);
        let backward = march(&plane, &torus, &s, Direction::Backward, &settings);
        let f_end = forward.points[50];
        let b_end = backward.points[50];
        // Opposite directions end on opposite sides of the seed.
        assert!((f_end - b_end).norm() > (f_end - s.point1).norm());
        assert!((f_end - s.point1).norm() > 0.1);
        let step = (forward.points[1] - forward.points[0]).norm();
        assert!(step > 0.005 && step < 0.015, "step length {step}");
    }

    #[test]
    fn test_jacobian_columns() {
        let t = Vec3::new(0.0, 1.0, 0.0);
        let j = jacobian(Vec3::x(), Vec3::y(), Vec3::z(), Vec3::x(), &t);
        assert_eq!(j.column(0).into_owned(), Vec4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(j.column(1).into_owned(), Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(j.column(2).into_owned(), Vec4::new(0.0, 0.0, -1.0, 0.0));
        assert_eq!(j.column(3).into_owned(), Vec4::new(-1.0, 0.0, 0.0, 0.0));
    }
}
