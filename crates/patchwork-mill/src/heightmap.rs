//! Heightmap baking.

use patchwork_geom::Surface;
use patchwork_math::Point2;
use patchwork_trim::TrimDomain;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{MillError, Result};

/// Heightmap baking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeSettings {
    /// Parameter samples per direction on every surface.
    pub samples: usize,
    /// Heightmap cells per axis.
    pub resolution: usize,
    /// Machine-plane extent `[min_x, min_y, max_x, max_y]`.
    pub extent: [f64; 4],
    /// Height of cells no surface reaches.
    pub base: f64,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self {
            samples: 1024,
            resolution: 512,
            extent: [-7.5, -7.5, 7.5, 7.5],
            base: 0.0,
        }
    }
}

impl BakeSettings {
    /// Reject empty rasters and degenerate extents.
    pub fn validate(&self) -> Result<()> {
        if self.samples < 2 || self.resolution == 0 {
            return Err(MillError::InvalidResolution {
                samples: self.samples,
                resolution: self.resolution,
            });
        }
        let [x0, y0, x1, y1] = self.extent;
        if !self.extent.iter().all(|v| v.is_finite()) || x1 <= x0 || y1 <= y0 {
            return Err(MillError::InvalidExtent(self.extent));
        }
        Ok(())
    }
}

/// One surface to bake and the raster that masks it.
#[derive(Debug, Clone, Copy)]
pub struct BakeTarget<'a> {
    /// Surface sampled over its whole parameter domain.
    pub surface: &'a dyn Surface,
    /// Samples hidden by this raster contribute no material.
    pub trim: Option<&'a TrimDomain>,
}

impl<'a> BakeTarget<'a> {
    /// Untrimmed target.
    pub fn new(surface: &'a dyn Surface) -> Self {
        Self { surface, trim: None }
    }

    /// Mask the target with `trim`.
    pub fn trimmed(mut self, trim: Option<&'a TrimDomain>) -> Self {
        self.trim = trim;
        self
    }

    fn keeps(&self, uv: Point2) -> bool {
        self.trim.map_or(true, |t| t.is_visible(uv.x, uv.y))
    }
}

/// Cell-centered grid of material heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightMap {
    /// Cells along X.
    pub nx: usize,
    /// Cells along Y.
    pub ny: usize,
    /// Extent `[min_x, min_y, max_x, max_y]`.
    pub bounds: [f64; 4],
    /// Heights, row-major (Y outer, X inner).
    pub heights: Vec<f64>,
    /// Height reported outside the extent.
    pub base: f64,
}

impl HeightMap {
    /// A map filled with `base`.
    pub fn new(nx: usize, ny: usize, bounds: [f64; 4], base: f64) -> Self {
        Self {
            nx,
            ny,
            bounds,
            heights: vec![base; nx * ny],
            base,
        }
    }

    /// Cell width.
    pub fn dx(&self) -> f64 {
        (self.bounds[2] - self.bounds[0]) / self.nx as f64
    }

    /// Cell depth.
    pub fn dy(&self) -> f64 {
        (self.bounds[3] - self.bounds[1]) / self.ny as f64
    }

    /// Center of cell `(ix, iy)`.
    pub fn xy_at(&self, ix: usize, iy: usize) -> (f64, f64) {
        (
            self.bounds[0] + (ix as f64 + 0.5) * self.dx(),
            self.bounds[1] + (iy as f64 + 0.5) * self.dy(),
        )
    }

    /// Flat index of cell `(ix, iy)`.
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.nx + ix
    }

    /// Height of cell `(ix, iy)`.
    pub fn get(&self, ix: usize, iy: usize) -> f64 {
        self.heights[self.index(ix, iy)]
    }

    /// Overwrite cell `(ix, iy)`.
    pub fn set(&mut self, ix: usize, iy: usize, z: f64) {
        let idx = self.index(ix, iy);
        self.heights[idx] = z;
    }

    /// Index of the cell containing `(x, y)`, if inside the extent.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<usize> {
        if !(x >= self.bounds[0] && x <= self.bounds[2] && y >= self.bounds[1] && y <= self.bounds[3]) {
            return None;
        }
        let ix = (((x - self.bounds[0]) / self.dx()) as usize).min(self.nx - 1);
        let iy = (((y - self.bounds[1]) / self.dy()) as usize).min(self.ny - 1);
        Some(self.index(ix, iy))
    }

    /// Material height at `(x, y)`; the base height outside the extent.
    pub fn depth_at(&self, x: f64, y: f64) -> f64 {
        self.cell_of(x, y).map_or(self.base, |idx| self.heights[idx])
    }

    /// Highest cell.
    pub fn max_height(&self) -> f64 {
        self.heights.iter().copied().fold(self.base, f64::max)
    }

    /// Bake surfaces into a new map.
    ///
    /// Each surface is sampled on a `samples × samples` parameter grid
    /// spanning its domain, skipping parameters its trim raster hides.
    /// Rows are sampled in parallel; the hits are composited with `max`
    /// only after every row has finished.
    pub fn bake(targets: &[BakeTarget<'_>], settings: &BakeSettings) -> Result<Self> {
        settings.validate()?;
        let n = settings.resolution;
        let mut map = Self::new(n, n, settings.extent, settings.base);
        let samples = settings.samples;

        for target in targets {
            let surface = target.surface;
            let ((u0, u1), (v0, v1)) = surface.domain();
            let rows: Vec<Vec<(usize, f64)>> = (0..samples)
                .into_par_iter()
                .map(|i| {
                    let u = u0 + (u1 - u0) * i as f64 / (samples - 1) as f64;
                    (0..samples)
                        .filter_map(|j| {
                            let v = v0 + (v1 - v0) * j as f64 / (samples - 1) as f64;
                            let uv = Point2::new(u, v);
                            if !target.keeps(uv) {
                                return None;
                            }
                            let p = surface.evaluate(uv);
                            map.cell_of(p.x, p.z).map(|idx| (idx, -p.y))
                        })
                        .collect()
                })
                .collect();

            for (idx, h) in rows.into_iter().flatten() {
                if h > map.heights[idx] {
                    map.heights[idx] = h;
                }
            }
        }

        info!(
            surfaces = targets.len(),
            trimmed = targets.iter().filter(|t| t.trim.is_some()).count(),
            resolution = n,
            top = map.max_height(),
            "heightmap baked"
        );
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use patchwork_geom::{SurfaceKind, TorusSurface};
    use patchwork_math::{Point3, Vec3};

    /// Square at height 1 over `[-2, 2]²` in the machine plane.
    #[derive(Debug)]
    struct Plateau;

    impl Surface for Plateau {
        fn evaluate(&self, uv: Point2) -> Point3 {
            Point3::new(-2.0 + 4.0 * uv.x, -1.0, -2.0 + 4.0 * uv.y)
        }
        fn d_du(&self, _uv: Point2) -> Vec3 {
            Vec3::new(4.0, 0.0, 0.0)
        }
        fn d_dv(&self, _uv: Point2) -> Vec3 {
            Vec3::new(0.0, 0.0, 4.0)
        }
        fn domain(&self) -> ((f64, f64), (f64, f64)) {
            ((0.0, 1.0), (0.0, 1.0))
        }
        fn is_u_wrapped(&self) -> bool {
            false
        }
        fn is_v_wrapped(&self) -> bool {
            false
        }
        fn surface_type(&self) -> SurfaceKind {
            SurfaceKind::Bezier
        }
    }

    fn small() -> BakeSettings {
        BakeSettings {
            samples: 256,
            resolution: 64,
            ..BakeSettings::default()
        }
    }

    #[test]
    fn test_cell_lookup() {
        let mut map = HeightMap::new(4, 2, [0.0, 0.0, 4.0, 2.0], -1.0);
        map.set(3, 1, 5.0);
        assert_eq!(map.get(3, 1), 5.0);
        assert_eq!(map.depth_at(3.5, 1.5), 5.0);
        assert_eq!(map.depth_at(4.0, 2.0), 5.0);
        assert_eq!(map.depth_at(0.5, 0.5), -1.0);
        assert_eq!(map.depth_at(-0.1, 0.5), -1.0);
        assert_eq!(map.xy_at(3, 1), (3.5, 1.5));
        assert_eq!(map.depth_at(f64::NAN, 0.0), -1.0);
    }

    #[test]
    fn test_bake_torus_ring() {
        // Tube top at height 1 along a ring of radius 3 in the machine plane.
        let torus = TorusSurface::with_axis(Point3::origin(), Vec3::y(), 3.0, 1.0);
        let map = HeightMap::bake(&[BakeTarget::new(&torus)], &small()).unwrap();
        assert_relative_eq!(map.depth_at(3.0, 0.0), 1.0, epsilon = 0.05);
        assert_relative_eq!(map.depth_at(0.0, -3.0), 1.0, epsilon = 0.05);
        assert_eq!(map.depth_at(0.0, 0.0), 0.0);
        assert_eq!(map.depth_at(7.0, 7.0), 0.0);
        assert!(map.max_height() <= 1.0 + 1e-12);
    }

    #[test]
    fn test_bake_composites_maximum() {
        let low = TorusSurface::with_axis(Point3::new(0.0, 0.5, 0.0), Vec3::y(), 3.0, 1.0);
        let high = TorusSurface::with_axis(Point3::new(0.0, -0.5, 0.0), Vec3::y(), 3.0, 1.0);
        let a = HeightMap::bake(&[BakeTarget::new(&low), BakeTarget::new(&high)], &small()).unwrap();
        let b = HeightMap::bake(&[BakeTarget::new(&high), BakeTarget::new(&low)], &small()).unwrap();
        assert_eq!(a, b);
        assert_relative_eq!(a.depth_at(3.0, 0.0), 1.5, epsilon = 0.05);
    }

    #[test]
    fn test_bake_skips_trimmed_samples() {
        // Split the square along u = 0.5 and hide the half with u > 0.5.
        let mut trim = TrimDomain::new(8, 8).unwrap();
        trim.trim_curve(&[Point2::new(0.5, 0.0), Point2::new(0.5, 1.0)]);
        assert_eq!(trim.trim(0.9, 0.5), 24);

        let settings = BakeSettings {
            samples: 128,
            resolution: 32,
            extent: [-3.0, -3.0, 3.0, 3.0],
            ..BakeSettings::default()
        };
        let full = HeightMap::bake(&[BakeTarget::new(&Plateau)], &settings).unwrap();
        let cut = HeightMap::bake(&[BakeTarget::new(&Plateau).trimmed(Some(&trim))], &settings).unwrap();

        assert_eq!(full.depth_at(1.2, 0.0), 1.0);
        assert_eq!(cut.depth_at(-1.2, 0.0), 1.0);
        assert_eq!(cut.depth_at(1.2, 0.0), settings.base);
        assert_eq!(cut.depth_at(1.2, -1.5), settings.base);
        assert_eq!(cut.depth_at(2.5, 0.0), settings.base);
    }

    #[test]
    fn test_bake_settings_validated() {
        let torus = TorusSurface::new(1.0, 0.5);
        let bad = BakeSettings {
            samples: 1,
            ..BakeSettings::default()
        };
        assert!(matches!(
            HeightMap::bake(&[BakeTarget::new(&torus)], &bad),
            Err(MillError::InvalidResolution { .. })
        ));
        let flipped = BakeSettings {
            extent: [1.0, 0.0, -1.0, 1.0],
            ..BakeSettings::default()
        };
        assert_eq!(flipped.validate(), Err(MillError::InvalidExtent(flipped.extent)));
    }
}
