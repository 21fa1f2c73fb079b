//! Single bicubic patches.

use patchwork_math::{Point3, Vec3};
use patchwork_topo::{PointId, PointStore};
use serde::{Deserialize, Serialize};

use crate::basis::{
    bernstein3, bspline3, bspline_derivative, bspline_point, decasteljau, decasteljau_derivative,
};

/// A 4×4 control grid addressed as `grid[x][y]`, `x` along u and `y` along v.
pub type PatchGrid = [[Point3; 4]; 4];

/// Basis used by a bicubic patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchKind {
    /// Bernstein basis, interpolating at the corners.
    Bezier,
    /// Uniform cubic B-spline basis, approximating.
    BSpline,
}

/// Position and first partial derivatives at a local patch parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchSample {
    /// Surface point.
    pub position: Point3,
    /// Derivative with respect to the local u parameter.
    pub du: Vec3,
    /// Derivative with respect to the local v parameter.
    pub dv: Vec3,
}

/// Evaluate a patch in the given basis at local `(lu, lv) ∈ [0, 1]²`.
///
/// Each column `grid[x]` is reduced along v first; the four column results
/// are then reduced along u.
pub fn evaluate_patch(kind: PatchKind, grid: &PatchGrid, lu: f64, lv: f64) -> PatchSample {
    match kind {
        PatchKind::Bezier => reduce(grid, lu, lv, decasteljau, decasteljau_derivative, bernstein3(lu)),
        PatchKind::BSpline => reduce(grid, lu, lv, bspline_point, bspline_derivative, bspline3(lu).cubic),
    }
}

fn reduce<P, D>(grid: &PatchGrid, lu: f64, lv: f64, point: P, derivative: D, weights: [f64; 4]) -> PatchSample
where
    P: Fn(&[Point3; 4], f64) -> Point3,
    D: Fn(&[Point3; 4], f64) -> Vec3,
{
    let mut rows = [Point3::origin(); 4];
    let mut row_dv = [Vec3::zeros(); 4];
    for x in 0..4 {
        rows[x] = point(&grid[x], lv);
        row_dv[x] = derivative(&grid[x], lv);
    }

    PatchSample {
        position: point(&rows, lu),
        du: derivative(&rows, lu),
        dv: row_dv[0] * weights[0] + row_dv[1] * weights[1] + row_dv[2] * weights[2] + row_dv[3] * weights[3],
    }
}

/// Corner offset inside a patch's local 4×4 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchOffset {
    /// Local x (u) index.
    pub x: i32,
    /// Local y (v) index.
    pub y: i32,
}

impl PatchOffset {
    /// Create an offset.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four corners in boundary-walking order.
    pub const CORNERS: [PatchOffset; 4] = [
        PatchOffset::new(0, 0),
        PatchOffset::new(3, 0),
        PatchOffset::new(3, 3),
        PatchOffset::new(0, 3),
    ];
}

/// Control-point references of one patch of a bicubic surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfacePatch {
    /// Point ids addressed as `points[x][y]`.
    pub points: [[PointId; 4]; 4],
    /// Patch column inside the owning surface.
    pub patch_x: usize,
    /// Patch row inside the owning surface.
    pub patch_y: usize,
}

impl SurfacePatch {
    /// Point id at a local offset. Offsets must lie in `[0, 3]²`.
    pub fn at(&self, offset: PatchOffset) -> PointId {
        self.points[offset.x as usize][offset.y as usize]
    }

    /// Corner ids in the order of [`PatchOffset::CORNERS`].
    pub fn corners(&self) -> [PointId; 4] {
        PatchOffset::CORNERS.map(|c| self.at(c))
    }

    /// Local offset of a corner with the given id, if any.
    pub fn corner_offset(&self, id: PointId) -> Option<PatchOffset> {
        PatchOffset::CORNERS.into_iter().find(|c| self.at(*c) == id)
    }

    /// Resolve all sixteen positions; `None` if any point is gone.
    pub fn resolve(&self, store: &PointStore) -> Option<PatchGrid> {
        let mut grid = [[Point3::origin(); 4]; 4];
        for x in 0..4 {
            for y in 0..4 {
                grid[x][y] = store.position(self.points[x][y])?;
            }
        }
        Some(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_grid() -> PatchGrid {
        let mut grid = [[Point3::origin(); 4]; 4];
        for x in 0..4 {
            for y in 0..4 {
                grid[x][y] = Point3::new(x as f64, 0.0, y as f64);
            }
        }
        grid
    }

    #[test]
    fn test_bezier_corners_interpolate() {
        let mut grid = flat_grid();
        grid[1][2].y = 2.0;
        grid[3][3].y = -1.0;
        for (lu, lv, x, y) in [(0.0, 0.0, 0, 0), (1.0, 0.0, 3, 0), (0.0, 1.0, 0, 3), (1.0, 1.0, 3, 3)] {
            let s = evaluate_patch(PatchKind::Bezier, &grid, lu, lv);
            assert!((s.position - grid[x][y]).norm() < 1e-12);
        }
    }

    #[test]
    fn test_bspline_corners_approximate() {
        let mut grid = flat_grid();
        grid[0][0].y = 3.0;
        let s = evaluate_patch(PatchKind::BSpline, &grid, 0.0, 0.0);
        assert!((s.position - grid[0][0]).norm() > 0.5);
        // Only the corner weight 1/6 * 1/6 reaches the raised point.
        let expected_y = 3.0 / 36.0;
        assert!((s.position.y - expected_y).abs() < 1e-12);
    }

    #[test]
    fn test_linear_grid_derivatives() {
        let grid = flat_grid();
        for kind in [PatchKind::Bezier, PatchKind::BSpline] {
            let s = evaluate_patch(kind, &grid, 0.3, 0.7);
            // Evenly spaced control points give a linear parameterization.
            let expected = match kind {
                PatchKind::Bezier => 3.0,
                PatchKind::BSpline => 1.0,
            };
            assert!((s.du - Vec3::new(expected, 0.0, 0.0)).norm() < 1e-12);
            assert!((s.dv - Vec3::new(0.0, 0.0, expected)).norm() < 1e-12);
        }
    }
}
