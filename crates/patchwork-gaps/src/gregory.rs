//! Gregory patches filling a triangular gap.

use patchwork_math::{Point3, Vec3};
use patchwork_spline::basis::{bernstein3, bisect};
use patchwork_spline::{PatchGrid, PatchOffset, SurfacePatch};
use patchwork_topo::PointStore;
use tracing::debug;

use crate::{GapError, Result, SurfaceGap};

// =============================================================================
// Boundary strips
// =============================================================================

/// Which boundary edge of a patch faces the gap, and in which sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchIndexing {
    /// Corner where the gap edge starts.
    pub start: PatchOffset,
    /// Corner where the gap edge ends.
    pub end: PatchOffset,
}

/// Boundary walks that turn clockwise in local `(x, y)` coordinates.
const CLOCKWISE: [(PatchOffset, PatchOffset); 4] = [
    (PatchOffset::new(0, 0), PatchOffset::new(3, 0)),
    (PatchOffset::new(3, 0), PatchOffset::new(3, 3)),
    (PatchOffset::new(3, 3), PatchOffset::new(0, 3)),
    (PatchOffset::new(0, 3), PatchOffset::new(0, 0)),
];

/// Indexing for edge `edge` of `gap`, owned by `patch`.
///
/// Gap edge `k` runs from `gap.vertices[k]` to `gap.vertices[k + 1]`.
pub fn indexing_for(gap: &SurfaceGap, edge: usize, patch: &SurfacePatch) -> Result<PatchIndexing> {
    let owner = gap.patches[edge];
    let start = patch
        .corner_offset(gap.vertices[edge])
        .ok_or(GapError::NotACorner { patch: owner })?;
    let end = patch
        .corner_offset(gap.vertices[(edge + 1) % 3])
        .ok_or(GapError::NotACorner { patch: owner })?;
    if start.x != end.x && start.y != end.y {
        return Err(GapError::NotAnEdge { patch: owner });
    }
    Ok(PatchIndexing { start, end })
}

/// Resample a patch so `strip[u][v]` runs along the gap edge in `u` and
/// into the patch in `v`.
pub fn reindex(grid: &PatchGrid, indexing: PatchIndexing) -> PatchGrid {
    let (ux, uy) = (
        (indexing.end.x - indexing.start.x) / 3,
        (indexing.end.y - indexing.start.y) / 3,
    );
    let clockwise = CLOCKWISE.contains(&(indexing.start, indexing.end));
    let (vx, vy) = if clockwise { (-uy, ux) } else { (uy, -ux) };

    let mut strip = [[Point3::origin(); 4]; 4];
    for (u, column) in strip.iter_mut().enumerate() {
        for (v, point) in column.iter_mut().enumerate() {
            let (u, v) = (u as i32, v as i32);
            let x = indexing.start.x + u * ux + v * vx;
            let y = indexing.start.y + u * uy + v * vy;
            *point = grid[x as usize][y as usize];
        }
    }
    strip
}

/// Split a reindexed strip at the middle of its gap edge.
///
/// Returns the half touching the edge start and the half touching the
/// edge end, both keeping the `[u][v]` layout of the input.
pub fn bisect_strip(strip: &PatchGrid) -> (PatchGrid, PatchGrid) {
    let mut first = [[Point3::origin(); 4]; 4];
    let mut second = [[Point3::origin(); 4]; 4];
    for v in 0..4 {
        let row = [strip[0][v], strip[1][v], strip[2][v], strip[3][v]];
        let (a, b) = bisect(&row);
        for u in 0..4 {
            first[u][v] = a[u];
            second[u][v] = b[u];
        }
    }
    (first, second)
}

// =============================================================================
// Gregory patch
// =============================================================================

/// A bicubic Gregory patch with split interior control points.
///
/// Corners run `p0 = (0,0)`, `p1 = (1,0)`, `p2 = (1,1)`, `p3 = (0,1)`.
/// Each interior point of a Bezier patch is replaced by two points, one
/// per adjacent boundary, blended rationally during evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GregoryPatch {
    /// Corner points `p0..p3`.
    pub corners: [Point3; 4],
    /// Boundary points walking `p0 → p1 → p2 → p3 → p0`, two per side.
    pub edges: [Point3; 8],
    /// Interior points, one per boundary point and in the same order.
    pub interior: [Point3; 8],
}

impl GregoryPatch {
    /// All twenty control points: corners, boundary, interior.
    pub fn points(&self) -> [Point3; 20] {
        let mut out = [Point3::origin(); 20];
        out[..4].copy_from_slice(&self.corners);
        out[4..12].copy_from_slice(&self.edges);
        out[12..].copy_from_slice(&self.interior);
        out
    }

    /// Bezier control grid at `(u, v)`, interior points blended.
    fn grid_at(&self, u: f64, v: f64) -> PatchGrid {
        let [p0, p1, p2, p3] = self.corners;
        let e = self.edges;
        let f = self.interior;

        let blend = |a: Point3, wa: f64, b: Point3, wb: f64| {
            let total = wa + wb;
            if total == 0.0 {
                Point3::from((a.coords + b.coords) * 0.5)
            } else {
                Point3::from((a.coords * wa + b.coords * wb) / total)
            }
        };

        let mut g = [[Point3::origin(); 4]; 4];
        g[0][0] = p0;
        g[3][0] = p1;
        g[3][3] = p2;
        g[0][3] = p3;

        g[1][0] = e[0];
        g[2][0] = e[1];
        g[3][1] = e[2];
        g[3][2] = e[3];
        g[2][3] = e[4];
        g[1][3] = e[5];
        g[0][2] = e[6];
        g[0][1] = e[7];

        g[1][1] = blend(f[0], u, f[7], v);
        g[2][1] = blend(f[1], 1.0 - u, f[2], v);
        g[2][2] = blend(f[4], 1.0 - u, f[3], 1.0 - v);
        g[1][2] = blend(f[5], u, f[6], 1.0 - v);
        g
    }

    /// Point at `(u, v) ∈ [0, 1]²`.
    pub fn evaluate(&self, u: f64, v: f64) -> Point3 {
        let g = self.grid_at(u, v);
        let bu = bernstein3(u);
        let bv = bernstein3(v);
        let mut sum = Vec3::zeros();
        for x in 0..4 {
            for y in 0..4 {
                sum += g[x][y].coords * (bu[x] * bv[y]);
            }
        }
        Point3::from(sum)
    }

    /// Control net as line segments: corner to boundary, boundary to
    /// interior.
    pub fn wireframe(&self) -> Vec<(Point3, Point3)> {
        let mut lines = Vec::with_capacity(16);
        for (i, edge) in self.edges.iter().enumerate() {
            // Boundary points 2k and 2k+1 hang off corners k and k+1.
            let corner = if i % 2 == 0 { i / 2 } else { (i / 2 + 1) % 4 };
            lines.push((self.corners[corner], *edge));
        }
        for (edge, inner) in self.edges.iter().zip(&self.interior) {
            lines.push((*edge, *inner));
        }
        lines
    }
}

// =============================================================================
// Fill construction
// =============================================================================

/// Three Gregory patches closing a triangular gap.
///
/// Patch `k` spans the midpoint of gap edge `k`, the gap corner shared
/// with edge `k + 1`, the midpoint of edge `k + 1`, and the common center.
#[derive(Debug, Clone, PartialEq)]
pub struct GregoryFill {
    /// Fill patches, one per gap corner.
    pub patches: [GregoryPatch; 3],
    /// Center point shared by all three patches.
    pub center: Point3,
}

impl GregoryFill {
    /// Build the fill for `gap`, resolving the bounding patches from
    /// `patches` (indexed by the gap's patch indices) and `store`.
    pub fn build(gap: &SurfaceGap, patches: &[SurfacePatch], store: &PointStore) -> Result<Self> {
        let mut halves = Vec::with_capacity(3);
        for edge in 0..3 {
            let index = gap.patches[edge];
            let patch = patches.get(index).ok_or(GapError::PatchIndex {
                index,
                count: patches.len(),
            })?;
            let indexing = indexing_for(gap, edge, patch)?;
            let grid = patch
                .resolve(store)
                .ok_or(GapError::MissingPoint { patch: index })?;
            halves.push(bisect_strip(&reindex(&grid, indexing)));
        }
        let halves: [(PatchGrid, PatchGrid); 3] = [halves[0], halves[1], halves[2]];
        Ok(Self::from_strips(&halves))
    }

    /// Build from the bisected boundary strips of the three gap edges.
    pub fn from_strips(halves: &[(PatchGrid, PatchGrid); 3]) -> Self {
        // Per edge: midpoint A, the point B behind it, the reflection D
        // into the hole and its continuation Q towards the center.
        let a: [Point3; 3] = std::array::from_fn(|k| halves[k].0[3][0]);
        let b: [Point3; 3] = std::array::from_fn(|k| halves[k].0[3][1]);
        let d: [Point3; 3] = std::array::from_fn(|k| a[k] + (a[k] - b[k]));
        let q: [Point3; 3] = std::array::from_fn(|k| Point3::from((d[k].coords * 3.0 - a[k].coords) / 2.0));
        let center = Point3::from((q[0].coords + q[1].coords + q[2].coords) / 3.0);
        let e: [Point3; 3] = std::array::from_fn(|k| Point3::from((q[k].coords * 2.0 + center.coords) / 3.0));

        let reflect = |edge: Point3, behind: Point3| edge + (edge - behind);

        let patches = std::array::from_fn(|k| {
            let next = (k + 1) % 3;
            let bottom = &halves[k].1;
            let right = &halves[next].0;

            let corners = [a[k], bottom[3][0], a[next], center];
            let edges = [
                bottom[1][0],
                bottom[2][0],
                right[1][0],
                right[2][0],
                d[next],
                e[next],
                e[k],
                d[k],
            ];
            let inner_center = e[k] + (e[next] - center);
            let interior = [
                reflect(bottom[1][0], bottom[1][1]),
                reflect(bottom[2][0], bottom[2][1]),
                reflect(right[1][0], right[1][1]),
                reflect(right[2][0], right[2][1]),
                d[next] + (right[2][0] - a[next]),
                inner_center,
                inner_center,
                d[k] + (bottom[1][0] - a[k]),
            ];
            GregoryPatch {
                corners,
                edges,
                interior,
            }
        });

        debug!(center = ?center, "gregory fill built");
        Self { patches, center }
    }

    /// Control nets of all three patches.
    pub fn wireframe(&self) -> Vec<(Point3, Point3)> {
        self.patches.iter().flat_map(|p| p.wireframe()).collect()
    }
}
