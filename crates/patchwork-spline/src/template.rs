//! Parametric builders for common surface layouts.

use std::f64::consts::TAU;

use patchwork_math::Point3;
use patchwork_topo::{PointId, PointStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::patch::PatchKind;
use crate::surface::{lattice_size, BicubicSurface};
use crate::{Result, SurfaceError};

/// Distance between neighbouring lattice points in grid and hat layouts.
pub const TEMPLATE_SPACING: f64 = 0.75;

/// Shape of the control lattice produced by a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// Flat grid in the `y = 0` plane.
    #[default]
    Grid,
    /// Tube around the y axis, periodic in u.
    Cylinder,
    /// Grid lifted into a bump around its center.
    Hat,
}

/// Recipe for a bicubic surface: basis, layout and patch counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceTemplate {
    /// Patch basis.
    pub kind: PatchKind,
    /// Lattice layout.
    pub mode: BuildMode,
    /// Patches along u.
    pub patches_x: usize,
    /// Patches along v.
    pub patches_y: usize,
    /// Lattice center.
    pub center: [f64; 3],
    /// Tube radius for [`BuildMode::Cylinder`].
    pub radius: f64,
}

impl SurfaceTemplate {
    /// Template centered at the origin with the default tube radius.
    pub fn new(kind: PatchKind, mode: BuildMode, patches_x: usize, patches_y: usize) -> Self {
        Self {
            kind,
            mode,
            patches_x,
            patches_y,
            center: [0.0; 3],
            radius: 2.0,
        }
    }

    /// Move the lattice center.
    pub fn centered_at(mut self, center: Point3) -> Self {
        self.center = [center.x, center.y, center.z];
        self
    }

    /// Set the tube radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Insert the control points into `store` and build the surface.
    pub fn build(&self, store: &mut PointStore) -> Result<BicubicSurface> {
        if self.patches_x == 0 || self.patches_y == 0 {
            return Err(SurfaceError::ZeroPatches {
                patches_x: self.patches_x,
                patches_y: self.patches_y,
            });
        }
        if self.mode == BuildMode::Cylinder && self.patches_x < 3 {
            return Err(SurfaceError::CylinderTooNarrow {
                patches_x: self.patches_x,
            });
        }

        let (width, height) = lattice_size(self.kind, self.patches_x, self.patches_y);
        // Columns at or past this index re-use earlier columns to close a tube.
        let closing = match (self.mode, self.kind) {
            (BuildMode::Cylinder, PatchKind::BSpline) => width - 3,
            (BuildMode::Cylinder, PatchKind::Bezier) => width - 1,
            _ => width,
        };

        let center = Point3::from(self.center);
        let origin_x = center.x - (width - 1) as f64 * TEMPLATE_SPACING / 2.0;
        let origin_z = center.z - (height - 1) as f64 * TEMPLATE_SPACING / 2.0;

        let mut ids = vec![PointId::default(); width * height];
        for y in 0..height {
            for x in 0..width {
                let index = y * width + x;
                if x >= closing {
                    ids[index] = ids[y * width + (x - closing)];
                    continue;
                }

                let gx = origin_x + x as f64 * TEMPLATE_SPACING;
                let gz = origin_z + y as f64 * TEMPLATE_SPACING;
                let position = match self.mode {
                    BuildMode::Grid => Point3::new(gx, center.y, gz),
                    BuildMode::Cylinder => {
                        let t = x as f64 / closing as f64 * TAU;
                        Point3::new(
                            center.x + self.radius * t.cos(),
                            center.y + self.radius * t.sin(),
                            gz,
                        )
                    }
                    BuildMode::Hat => {
                        let dx = gx - center.x;
                        let dz = gz - center.z;
                        let lift = -(1.0 / (1.0 + 0.25 * (dx * dx + dz * dz))).exp();
                        Point3::new(gx, center.y + lift, gz)
                    }
                };
                ids[index] = store.insert(position);
            }
        }

        debug!(
            kind = ?self.kind,
            mode = ?self.mode,
            width,
            height,
            "built surface template"
        );

        let wrap_u = self.mode == BuildMode::Cylinder;
        BicubicSurface::new(self.kind, self.patches_x, self.patches_y, ids, (wrap_u, false), store)
    }
}
