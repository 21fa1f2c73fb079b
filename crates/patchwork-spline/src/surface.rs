//! Piecewise bicubic surfaces over a shared control lattice.

use patchwork_geom::{Surface, SurfaceKind};
use patchwork_math::{fit_param, Point2, Point3, Vec3};
use patchwork_topo::{PointId, PointStore, TopoError};
use tracing::warn;

use crate::patch::{evaluate_patch, PatchGrid, PatchKind, PatchSample, SurfacePatch};
use crate::{Result, SurfaceError};

/// Lattice size `(width, height)` implied by a patch layout.
///
/// Bezier patches share their boundary rows (3 new points per patch plus
/// one shared), B-spline patches slide a 4×4 window over the lattice.
pub fn lattice_size(kind: PatchKind, patches_x: usize, patches_y: usize) -> (usize, usize) {
    match kind {
        PatchKind::Bezier => (3 * patches_x + 1, 3 * patches_y + 1),
        PatchKind::BSpline => (patches_x + 3, patches_y + 3),
    }
}

/// Default topology: sixteen lattice indices per patch, patches in
/// row-major order, local point `[x][y]` stored at `y * 4 + x`.
pub fn default_topology(kind: PatchKind, patches_x: usize, patches_y: usize) -> Vec<usize> {
    let (width, _) = lattice_size(kind, patches_x, patches_y);
    let stride = match kind {
        PatchKind::Bezier => 3,
        PatchKind::BSpline => 1,
    };
    let mut topology = Vec::with_capacity(patches_x * patches_y * 16);
    for py in 0..patches_y {
        for px in 0..patches_x {
            for y in 0..4 {
                for x in 0..4 {
                    topology.push((px * stride + x) + (py * stride + y) * width);
                }
            }
        }
    }
    topology
}

/// A bicubic surface referencing control points by id.
///
/// The surface clears the deletability flag of every referenced point for
/// as long as it exists; call [`BicubicSurface::release`] before dropping
/// it to hand the points back.
#[derive(Debug, Clone)]
pub struct BicubicSurface {
    kind: PatchKind,
    patches_x: usize,
    patches_y: usize,
    points: Vec<PointId>,
    topology: Vec<usize>,
    wrap_u: bool,
    wrap_v: bool,
    geometry: Option<BicubicGeometry>,
}

impl BicubicSurface {
    /// Build a surface over a row-major control lattice with the default
    /// topology.
    pub fn new(
        kind: PatchKind,
        patches_x: usize,
        patches_y: usize,
        points: Vec<PointId>,
        wrap: (bool, bool),
        store: &mut PointStore,
    ) -> Result<Self> {
        check_patches(patches_x, patches_y)?;
        let topology = default_topology(kind, patches_x, patches_y);
        Self::with_topology(kind, patches_x, patches_y, points, topology, wrap, store)
    }

    /// Build a surface with an explicit patch topology.
    pub fn with_topology(
        kind: PatchKind,
        patches_x: usize,
        patches_y: usize,
        points: Vec<PointId>,
        topology: Vec<usize>,
        wrap: (bool, bool),
        store: &mut PointStore,
    ) -> Result<Self> {
        check_patches(patches_x, patches_y)?;

        let (width, height) = lattice_size(kind, patches_x, patches_y);
        if points.len() != width * height {
            return Err(SurfaceError::PointCount {
                expected: width * height,
                actual: points.len(),
            });
        }
        if topology.len() != 16 * patches_x * patches_y {
            return Err(SurfaceError::TopologyLength {
                expected: 16 * patches_x * patches_y,
                actual: topology.len(),
            });
        }
        if let Some(&index) = topology.iter().find(|&&i| i >= points.len()) {
            return Err(SurfaceError::TopologyIndex {
                index,
                len: points.len(),
            });
        }

        for &id in &points {
            if store.contains(id) {
                store.set_deletable(id, false)?;
            }
        }

        let mut surface = Self {
            kind,
            patches_x,
            patches_y,
            points,
            topology,
            wrap_u: wrap.0,
            wrap_v: wrap.1,
            geometry: None,
        };
        surface.rebuild(store);
        Ok(surface)
    }

    /// Rebuild from the serialized form: lattice ids plus sixteen ids per
    /// patch.
    pub fn from_serialized(
        kind: PatchKind,
        patches_x: usize,
        patches_y: usize,
        points: Vec<PointId>,
        patches: &[[PointId; 16]],
        wrap: (bool, bool),
        store: &mut PointStore,
    ) -> Result<Self> {
        let mut topology = Vec::with_capacity(patches.len() * 16);
        for patch in patches {
            for id in patch {
                let index = points
                    .iter()
                    .position(|p| p == id)
                    .ok_or(SurfaceError::ForeignPoint)?;
                topology.push(index);
            }
        }
        Self::with_topology(kind, patches_x, patches_y, points, topology, wrap, store)
    }

    /// Basis of every patch.
    pub fn kind(&self) -> PatchKind {
        self.kind
    }

    /// Patches along u.
    pub fn patches_x(&self) -> usize {
        self.patches_x
    }

    /// Patches along v.
    pub fn patches_y(&self) -> usize {
        self.patches_y
    }

    /// Control lattice `(width, height)`.
    pub fn lattice_size(&self) -> (usize, usize) {
        lattice_size(self.kind, self.patches_x, self.patches_y)
    }

    /// Periodicity flags `(u, v)`.
    pub fn wrap(&self) -> (bool, bool) {
        (self.wrap_u, self.wrap_v)
    }

    /// Whether `id` is part of the control lattice.
    pub fn contains_point(&self, id: PointId) -> bool {
        self.points.contains(&id)
    }

    /// Point references of patch `(x, y)`.
    pub fn patch(&self, x: usize, y: usize) -> SurfacePatch {
        let base = (y * self.patches_x + x) * 16;
        let mut points = [[PointId::default(); 4]; 4];
        for i in 0..16 {
            points[i % 4][i / 4] = self.points[self.topology[base + i]];
        }
        SurfacePatch {
            points,
            patch_x: x,
            patch_y: y,
        }
    }

    /// All patches in row-major order.
    pub fn patches(&self) -> Vec<SurfacePatch> {
        let mut out = Vec::with_capacity(self.patches_x * self.patches_y);
        for y in 0..self.patches_y {
            for x in 0..self.patches_x {
                out.push(self.patch(x, y));
            }
        }
        out
    }

    /// Re-resolve control point positions.
    ///
    /// Returns whether the surface is ready. A missing point leaves the
    /// surface not ready until a later rebuild succeeds.
    pub fn rebuild(&mut self, store: &PointStore) -> bool {
        let mut grids = Vec::with_capacity(self.patches_x * self.patches_y);
        for patch in self.patches() {
            match patch.resolve(store) {
                Some(grid) => grids.push(grid),
                None => {
                    warn!(
                        patch_x = patch.patch_x,
                        patch_y = patch.patch_y,
                        "control point missing, surface not ready"
                    );
                    self.geometry = None;
                    return false;
                }
            }
        }
        self.geometry = Some(BicubicGeometry {
            kind: self.kind,
            patches_x: self.patches_x,
            patches_y: self.patches_y,
            grids,
            wrap_u: self.wrap_u,
            wrap_v: self.wrap_v,
        });
        true
    }

    /// Whether the last rebuild resolved every point.
    pub fn is_ready(&self) -> bool {
        self.geometry.is_some()
    }

    /// Resolved geometry from the last successful rebuild.
    pub fn geometry(&self) -> Option<&BicubicGeometry> {
        self.geometry.as_ref()
    }

    /// Substitute `new` for every reference to `old`.
    ///
    /// Returns `true` when the topology changed. The replaced point becomes
    /// deletable again; the surface is rebuilt.
    pub fn replace_point(&mut self, old: PointId, new: PointId, store: &mut PointStore) -> Result<bool> {
        if old == new || !self.contains_point(old) {
            return Ok(false);
        }
        if !store.contains(new) {
            return Err(TopoError::UnknownPoint(new).into());
        }
        for id in self.points.iter_mut().filter(|id| **id == old) {
            *id = new;
        }
        if store.contains(old) {
            store.set_deletable(old, true)?;
        }
        store.set_deletable(new, false)?;
        self.rebuild(store);
        Ok(true)
    }

    /// Hand every referenced point still in `store` back to the user.
    ///
    /// Returns how many distinct points were released.
    pub fn release(&self, store: &mut PointStore) -> Result<usize> {
        let mut live: Vec<PointId> = self.points.iter().copied().filter(|&id| store.contains(id)).collect();
        live.sort_unstable();
        live.dedup();
        for &id in &live {
            store.set_deletable(id, true)?;
        }
        Ok(live.len())
    }

    /// Ordered lattice ids (duplicates kept for wrapped lattices).
    pub fn serialize_points(&self) -> Vec<PointId> {
        self.points.clone()
    }

    /// Sixteen ids per patch, local point `[x][y]` at `y * 4 + x`.
    pub fn serialize_patches(&self) -> Vec<[PointId; 16]> {
        self.topology
            .chunks_exact(16)
            .map(|chunk| {
                let mut ids = [PointId::default(); 16];
                for (slot, &index) in ids.iter_mut().zip(chunk) {
                    *slot = self.points[index];
                }
                ids
            })
            .collect()
    }
}

fn check_patches(patches_x: usize, patches_y: usize) -> Result<()> {
    if patches_x == 0 || patches_y == 0 {
        return Err(SurfaceError::ZeroPatches {
            patches_x,
            patches_y,
        });
    }
    Ok(())
}

// =============================================================================
// Resolved geometry
// =============================================================================

/// Positions of a bicubic surface resolved from the point arena.
///
/// The global parameter square `[0, 1]²` is split evenly between patches.
/// Periodic directions wrap, the others clamp; the last patch also owns
/// the closing boundary `u = 1` (or `v = 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct BicubicGeometry {
    kind: PatchKind,
    patches_x: usize,
    patches_y: usize,
    grids: Vec<PatchGrid>,
    wrap_u: bool,
    wrap_v: bool,
}

impl BicubicGeometry {
    /// Geometry from explicit patch grids in row-major patch order.
    pub fn from_grids(
        kind: PatchKind,
        patches_x: usize,
        patches_y: usize,
        grids: Vec<PatchGrid>,
        wrap: (bool, bool),
    ) -> Result<Self> {
        check_patches(patches_x, patches_y)?;
        if grids.len() != patches_x * patches_y {
            return Err(SurfaceError::TopologyLength {
                expected: 16 * patches_x * patches_y,
                actual: 16 * grids.len(),
            });
        }
        Ok(Self {
            kind,
            patches_x,
            patches_y,
            grids,
            wrap_u: wrap.0,
            wrap_v: wrap.1,
        })
    }

    /// Control grid of patch `(x, y)`.
    pub fn grid(&self, x: usize, y: usize) -> &PatchGrid {
        &self.grids[y * self.patches_x + x]
    }

    fn locate(global: f64, patches: usize, wrapped: bool) -> (usize, f64) {
        let t = fit_param(global, 0.0, 1.0, wrapped) * patches as f64;
        let index = (t.floor().max(0.0) as usize).min(patches - 1);
        (index, t - index as f64)
    }

    /// Position and chain-ruled derivatives at global `(u, v)`.
    pub fn sample(&self, uv: Point2) -> PatchSample {
        let (px, lu) = Self::locate(uv.x, self.patches_x, self.wrap_u);
        let (py, lv) = Self::locate(uv.y, self.patches_y, self.wrap_v);
        let local = evaluate_patch(self.kind, self.grid(px, py), lu, lv);
        PatchSample {
            position: local.position,
            du: local.du * self.patches_x as f64,
            dv: local.dv * self.patches_y as f64,
        }
    }
}

impl Surface for BicubicGeometry {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.sample(uv).position
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        self.sample(uv).du
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        self.sample(uv).dv
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((0.0, 1.0), (0.0, 1.0))
    }

    fn is_u_wrapped(&self) -> bool {
        self.wrap_u
    }

    fn is_v_wrapped(&self) -> bool {
        self.wrap_v
    }

    fn surface_type(&self) -> SurfaceKind {
        match self.kind {
            PatchKind::Bezier => SurfaceKind::Bezier,
            PatchKind::BSpline => SurfaceKind::BSpline,
        }
    }
}
