#![warn(missing_docs)]

//! Surface-surface intersection tracing.
//!
//! Tracing runs in two phases. [`seed`] finds one common point of two
//! surfaces by gradient descent on their squared distance, trying a cursor
//! hint and then a fixed list of start candidates. [`march`] then follows
//! the intersection curve from that point with a damped Newton corrector
//! constrained to a plane a fixed step ahead along the curve tangent.
//!
//! Failure to find a seed is an ordinary outcome (`None`), not an error.

mod march;
mod seed;

pub use march::{march, Direction, IntersectionCurve, MarchSettings};
pub use seed::{descend, seed, SeedOutcome, SeedSettings};

use patchwork_geom::Surface;
use patchwork_math::Point3;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Seeding and marching parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    /// Seed search.
    pub seed: SeedSettings,
    /// Curve following.
    pub march: MarchSettings,
}

/// A traced intersection: the seed and one curve per direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Starting point shared by both traces.
    pub seed: SeedOutcome,
    /// Trace along `+normalize(n1 × n2)`.
    pub forward: IntersectionCurve,
    /// Trace along `-normalize(n1 × n2)`.
    pub backward: IntersectionCurve,
}

impl Intersection {
    /// Marker positions: both seed samples, then every `every`-th point of
    /// each trace on both surfaces.
    pub fn debug_markers(&self, every: usize) -> Vec<Point3> {
        let every = every.max(1);
        let mut markers = vec![self.seed.point1, self.seed.point2];
        for curve in [&self.forward, &self.backward] {
            for i in (0..curve.len()).step_by(every) {
                markers.push(curve.points[i]);
                markers.push(curve.points2[i]);
            }
        }
        markers
    }
}

/// Seed and trace the intersection of two surfaces in both directions.
pub fn trace<A, B>(s1: &A, s2: &B, settings: &TraceSettings, hint: Option<Point3>) -> Option<Intersection>
where
    A: Surface + ?Sized,
    B: Surface + ?Sized,
{
    let seed = seed(s1, s2, &settings.seed, hint)?;
    let forward = march(s1, s2, &seed, Direction::Forward, &settings.march);
    let backward = march(s1, s2, &seed, Direction::Backward, &settings.march);
    info!(
        forward = forward.len(),
        backward = backward.len(),
        "intersection traced"
    );
    Some(Intersection {
        seed,
        forward,
        backward,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use patchwork_math::Point3;
    use patchwork_spline::{BicubicGeometry, PatchKind};

    /// Flat Bezier patch spanning `[-2, 2]²` in the `z = 0` plane.
    pub fn plane() -> BicubicGeometry {
        let grid = std::array::from_fn(|x| {
            std::array::from_fn(|y| Point3::new(-2.0 + 4.0 * x as f64 / 3.0, -2.0 + 4.0 * y as f64 / 3.0, 0.0))
        });
        BicubicGeometry::from_grids(PatchKind::Bezier, 1, 1, vec![grid], (false, false)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::plane;
    use super::*;
    use patchwork_geom::TorusSurface;

    #[test]
    fn test_trace_plane_through_torus() {
        let plane = plane();
        let torus = TorusSurface::new(1.0, 0.4);
        let result = trace(&plane, &torus, &TraceSettings::default(), None).unwrap();
        assert_eq!(result.forward.len(), 1001);
        assert_eq!(result.backward.len(), 1001);

        let markers = result.debug_markers(20);
        assert_eq!(markers.len(), 2 + 2 * 2 * 51);
        assert_eq!(markers[0], result.seed.point1);
    }

    #[test]
    fn test_trace_reports_missing_intersection() {
        let plane = plane();
        let torus = TorusSurface::with_axis(Point3::new(0.0, 0.0, 10.0), patchwork_math::Vec3::z(), 1.0, 0.4);
        assert!(trace(&plane, &torus, &TraceSettings::default(), None).is_none());
    }
}
