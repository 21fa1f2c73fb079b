//! Gradient-descent seeding.

use patchwork_geom::Surface;
use patchwork_math::{Point2, Point3, Vec4};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Parameters of the seed search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    /// Initial descent step.
    pub step: f64,
    /// Initial convergence threshold on parameter displacement.
    pub epsilon: f64,
    /// Step multiplier applied at each shrink.
    pub step_factor: f64,
    /// Threshold multiplier applied at each shrink.
    pub epsilon_factor: f64,
    /// Hard cap on descent iterations per candidate.
    pub max_iterations: usize,
    /// Maximum number of shrinks.
    pub max_shrinks: usize,
    /// Largest accepted distance between the two surface samples.
    pub acceptance: f64,
    /// Start positions on the unit square diagonal, tried in order.
    pub candidates: Vec<f64>,
    /// Grid resolution of the closest-sample search around a hint.
    pub hint_resolution: usize,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            step: 0.001,
            epsilon: 1e-5,
            step_factor: 0.5,
            epsilon_factor: 0.1,
            max_iterations: 1000,
            max_shrinks: 5,
            acceptance: 0.01,
            candidates: vec![0.0, 0.5, 1.0],
            hint_resolution: 32,
        }
    }
}

/// Result of one descent run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedOutcome {
    /// Parameters on the first surface.
    pub params1: Point2,
    /// Parameters on the second surface.
    pub params2: Point2,
    /// First surface sample.
    pub point1: Point3,
    /// Second surface sample.
    pub point2: Point3,
    /// Distance between the two samples.
    pub distance: f64,
    /// Descent iterations taken.
    pub iterations: usize,
}

/// Growth applied to the last accepted step length before the next trial.
const STEP_GROWTH: f64 = 2.0;

/// Halvings tried per iteration before the descent gives up on a direction.
const MAX_BACKTRACKS: usize = 40;

fn split(x: &Vec4) -> (Point2, Point2) {
    (Point2::new(x[0], x[1]), Point2::new(x[2], x[3]))
}

/// Squared distance and its gradient with respect to `(u, v, p, q)`.
fn distance_gradient<A, B>(s1: &A, s2: &B, x: &Vec4) -> (f64, Vec4)
where
    A: Surface + ?Sized,
    B: Surface + ?Sized,
{
    let (a, b) = split(x);
    let diff = s1.evaluate(a) - s2.evaluate(b);
    let gradient = Vec4::new(
        2.0 * s1.d_du(a).dot(&diff),
        2.0 * s1.d_dv(a).dot(&diff),
        -2.0 * s2.d_du(b).dot(&diff),
        -2.0 * s2.d_dv(b).dot(&diff),
    );
    (diff.norm_squared(), gradient)
}

fn fitted_step<A, B>(s1: &A, s2: &B, x: &Vec4, gradient: &Vec4, step: f64) -> Vec4
where
    A: Surface + ?Sized,
    B: Surface + ?Sized,
{
    let a = s1.fit(Point2::new(x[0] - step * gradient[0], x[1] - step * gradient[1]));
    let b = s2.fit(Point2::new(x[2] - step * gradient[2], x[3] - step * gradient[3]));
    Vec4::new(a.x, a.y, b.x, b.y)
}

/// Run gradient descent on `|S1(u, v) - S2(p, q)|²` from `start`.
///
/// Every iteration moves along `-step·∇d`, where `step` starts at
/// `settings.step`, grows by [`STEP_GROWTH`] after each accepted move and
/// halves until the squared distance actually drops. An iteration that
/// finds no decrease ends the descent.
///
/// The loop runs while either parameter pair moved more than the current
/// threshold in the last step, and never past `max_iterations`. When both
/// pairs settle below the threshold, the threshold and step shrink, up to
/// `max_shrinks` times.
pub fn descend<A, B>(s1: &A, s2: &B, start: (Point2, Point2), settings: &SeedSettings) -> SeedOutcome
where
    A: Surface + ?Sized,
    B: Surface + ?Sized,
{
    let mut x = Vec4::new(start.0.x, start.0.y, start.1.x, start.1.y);
    let mut step = settings.step;
    let mut epsilon = settings.epsilon;
    let mut shrinks = 0;
    let mut iterations = 0;

    while iterations < settings.max_iterations {
        let (current, gradient) = distance_gradient(s1, s2, &x);
        iterations += 1;

        let mut trial = step * STEP_GROWTH;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let candidate = fitted_step(s1, s2, &x, &gradient, trial);
            let (a, b) = split(&candidate);
            if (s1.evaluate(a) - s2.evaluate(b)).norm_squared() < current {
                accepted = Some(candidate);
                break;
            }
            trial *= 0.5;
        }
        let Some(next) = accepted else {
            debug!(iterations, distance = current.sqrt(), "seed descent stalled");
            break;
        };

        let previous = x;
        x = next;
        step = trial;

        // A wrap jumps a whole period, so the raw step bounds the displacement.
        let moved = x - previous;
        let d1 = (step * gradient.fixed_rows::<2>(0).norm()).min(moved.fixed_rows::<2>(0).norm());
        let d2 = (step * gradient.fixed_rows::<2>(2).norm()).min(moved.fixed_rows::<2>(2).norm());

        if d1 < epsilon && d2 < epsilon && shrinks < settings.max_shrinks {
            shrinks += 1;
            epsilon *= settings.epsilon_factor;
            step *= settings.step_factor;
            debug!(iterations, shrinks, epsilon, step, "seed descent shrink");
        }

        if d1 <= epsilon && d2 <= epsilon {
            break;
        }
    }

    let (params1, params2) = split(&x);
    let point1 = s1.evaluate(params1);
    let point2 = s2.evaluate(params2);
    SeedOutcome {
        params1,
        params2,
        point1,
        point2,
        distance: (point1 - point2).norm(),
        iterations,
    }
}

/// Parameters of the grid sample closest to `target`.
fn closest_sample<S: Surface + ?Sized>(surface: &S, target: Point3, resolution: usize) -> Point2 {
    let n = resolution.max(1);
    let mut best = (f64::INFINITY, surface.from_unit(Point2::origin()));
    for i in 0..=n {
        for j in 0..=n {
            let uv = surface.from_unit(Point2::new(i as f64 / n as f64, j as f64 / n as f64));
            let d = (surface.evaluate(uv) - target).norm_squared();
            if d < best.0 {
                best = (d, uv);
            }
        }
    }
    best.1
}

/// Find a point common to both surfaces.
///
/// A `hint` (typically the 3D cursor) is tried first, starting from the
/// closest grid sample on each surface; then every diagonal candidate.
/// The first run whose samples end within `acceptance` wins.
pub fn seed<A, B>(s1: &A, s2: &B, settings: &SeedSettings, hint: Option<Point3>) -> Option<SeedOutcome>
where
    A: Surface + ?Sized,
    B: Surface + ?Sized,
{
    let hinted = hint.map(|h| {
        (
            closest_sample(s1, h, settings.hint_resolution),
            closest_sample(s2, h, settings.hint_resolution),
        )
    });
    let diagonal = settings.candidates.iter().map(|&c| {
        let s = Point2::new(c, c);
        (s1.from_unit(s), s2.from_unit(s))
    });

    for start in hinted.into_iter().chain(diagonal) {
        let outcome = descend(s1, s2, start, settings);
        debug!(
            distance = outcome.distance,
            iterations = outcome.iterations,
            "seed candidate finished"
        );
        if outcome.distance <= settings.acceptance {
            return Some(outcome);
        }
    }

    warn!("no intersection found between surfaces");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::plane;
    use patchwork_geom::TorusSurface;
    use patchwork_math::{Transform, Vec3};

    #[test]
    fn test_plane_and_torus_seed() {
        let plane = plane();
        let torus = TorusSurface::new(1.0, 0.4);
        let outcome = seed(&plane, &torus, &SeedSettings::default(), None).unwrap();
        assert!(outcome.distance < 0.01);
        assert!(outcome.point2.z.abs() < 0.01);
        let r = (outcome.point2.x.powi(2) + outcome.point2.y.powi(2)).sqrt();
        assert!((r - 1.4).abs() < 0.01 || (r - 0.6).abs() < 0.01);
    }

    #[test]
    fn test_overlapping_tori_seed() {
        let a = TorusSurface::new(1.0, 0.4);
        let b = a.transform(&Transform::translation(0.3, 0.2, 0.15));
        let outcome = seed(&a, &b, &SeedSettings::default(), None).unwrap();
        assert!(outcome.distance < 0.01);
        // Parameters stay inside the periodic domain.
        for p in [outcome.params1, outcome.params2] {
            assert!((0.0..std::f64::consts::TAU).contains(&p.x));
            assert!((0.0..std::f64::consts::TAU).contains(&p.y));
        }
    }

    #[test]
    fn test_every_diagonal_candidate_converges_on_overlapping_tori() {
        let a = TorusSurface::new(1.0, 0.4);
        let b = a.transform(&Transform::translation(0.3, 0.2, 0.15));
        let settings = SeedSettings::default();
        for &c in &settings.candidates {
            let start = (a.from_unit(Point2::new(c, c)), b.from_unit(Point2::new(c, c)));
            let outcome = descend(&a, &b, start, &settings);
            assert!(outcome.distance < settings.acceptance, "candidate {c}: {}", outcome.distance);
            assert!(outcome.iterations <= settings.max_iterations);
        }
    }

    #[test]
    fn test_distant_tori_have_no_seed() {
        let a = TorusSurface::new(1.0, 0.4);
        let b = a.transform(&Transform::translation(10.0, 0.0, 0.0));
        assert!(seed(&a, &b, &SeedSettings::default(), None).is_none());
    }

    #[test]
    fn test_iteration_cap_is_respected() {
        let a = TorusSurface::new(1.0, 0.4);
        let b = a.transform(&Transform::translation(10.0, 0.0, 0.0));
        let settings = SeedSettings {
            max_iterations: 7,
            ..SeedSettings::default()
        };
        let outcome = descend(&a, &b, (Point2::new(1.0, 0.5), Point2::new(2.0, 0.3)), &settings);
        assert_eq!(outcome.iterations, 7);
    }

    #[test]
    fn test_hint_selects_nearby_branch() {
        let plane = plane();
        let torus = TorusSurface::new(1.0, 0.4);
        let hint = Point3::new(-0.6, 0.0, 0.0);
        let outcome = seed(&plane, &torus, &SeedSettings::default(), Some(hint)).unwrap();
        assert!((outcome.point1 - hint).norm() < 0.2);
    }

    #[test]
    fn test_clamped_plane_parameters() {
        let plane = plane();
        let torus = TorusSurface::with_axis(Point3::new(5.0, 0.0, 0.0), Vec3::z(), 1.0, 0.4);
        let outcome = descend(&plane, &torus, (Point2::new(1.0, 0.5), Point2::origin()), &SeedSettings::default());
        assert!(outcome.params1.x <= 1.0);
        assert!(outcome.distance > 1.0);
    }
}
