//! Probe-based roughing and finishing sweeps.

use patchwork_math::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Cutter, HeightMap, MillError, Result, ToolPath};

/// Sampled cutter tip shape: offsets from the tip axis and how far the
/// cutter surface rises above the tip at each offset.
#[derive(Debug, Clone)]
pub struct Probe {
    offsets: Vec<(f64, f64, f64)>,
}

impl Probe {
    fn sampled(radius: f64, resolution: usize, rise: impl Fn(f64) -> f64) -> Self {
        let mut offsets = vec![(0.0, 0.0, 0.0)];
        let n = resolution.max(2);
        for i in 0..n {
            for j in 0..n {
                let dx = -radius + 2.0 * radius * i as f64 / (n - 1) as f64;
                let dy = -radius + 2.0 * radius * j as f64 / (n - 1) as f64;
                let rho2 = dx * dx + dy * dy;
                if rho2 <= radius * radius {
                    offsets.push((dx, dy, rise(rho2)));
                }
            }
        }
        Self { offsets }
    }

    /// Paraboloid `ρ² / 2r` approximating a ball tip of radius `radius`.
    pub fn paraboloid(radius: f64, resolution: usize) -> Self {
        Self::sampled(radius, resolution, |rho2| rho2 / (2.0 * radius))
    }

    /// Exact spherical tip.
    pub fn sphere(radius: f64, resolution: usize) -> Self {
        Self::sampled(radius, resolution, |rho2| radius - (radius * radius - rho2).max(0.0).sqrt())
    }

    /// Flat tip.
    pub fn flat(radius: f64, resolution: usize) -> Self {
        Self::sampled(radius, resolution, |_| 0.0)
    }

    /// Number of sample offsets.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Always false; the tip axis is sampled.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Lowest tip height at `(x, y)` that keeps the sampled tip on or
    /// above the material.
    pub fn required_height(&self, map: &HeightMap, x: f64, y: f64) -> f64 {
        self.offsets
            .iter()
            .map(|&(dx, dy, rise)| map.depth_at(x + dx, y + dy) - rise)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Parameters for [`rough`] and [`finish`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoughingSettings {
    /// Stepover as a fraction of the probe diameter.
    pub step_factor: f64,
    /// Extra clearance added above every required height.
    pub safety_epsilon: f64,
    /// Retract height for entry, exit and level changes.
    pub safe_z: f64,
    /// Cutting levels, machined from the highest down.
    pub levels: Vec<f64>,
    /// Distance between probed positions along a sweep.
    pub sample_spacing: f64,
    /// Probe radius as a fraction of the cutter radius when roughing.
    pub probe_factor: f64,
    /// Probe grid size per axis.
    pub probe_resolution: usize,
    /// Stepover of the finishing sweep.
    pub finish_stepover: f64,
}

impl Default for RoughingSettings {
    fn default() -> Self {
        Self {
            step_factor: 0.9,
            safety_epsilon: 0.01,
            safe_z: 6.0,
            levels: vec![3.5, 2.0],
            sample_spacing: 0.05,
            probe_factor: 0.8,
            probe_resolution: 32,
            finish_stepover: 0.1,
        }
    }
}

impl RoughingSettings {
    /// Set the retract height.
    pub fn with_safe_z(mut self, safe_z: f64) -> Self {
        self.safe_z = safe_z;
        self
    }

    /// Set the cutting levels.
    pub fn with_levels(mut self, levels: Vec<f64>) -> Self {
        self.levels = levels;
        self
    }

    /// Set the clearance above the material.
    pub fn with_safety_epsilon(mut self, epsilon: f64) -> Self {
        self.safety_epsilon = epsilon;
        self
    }

    /// Set the distance between probed positions.
    pub fn with_sample_spacing(mut self, spacing: f64) -> Self {
        self.sample_spacing = spacing;
        self
    }

    /// Set the finishing stepover.
    pub fn with_finish_stepover(mut self, stepover: f64) -> Self {
        self.finish_stepover = stepover;
        self
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("step_factor", self.step_factor),
            ("sample_spacing", self.sample_spacing),
            ("probe_factor", self.probe_factor),
            ("finish_stepover", self.finish_stepover),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(MillError::InvalidSetting { name, value });
            }
        }
        if !self.safety_epsilon.is_finite() || self.safety_epsilon < 0.0 {
            return Err(MillError::InvalidSetting {
                name: "safety_epsilon",
                value: self.safety_epsilon,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Sweeps
// =============================================================================

/// Evenly spaced values from `a` to `b` inclusive, at most `spacing` apart.
fn spaced(a: f64, b: f64, spacing: f64) -> impl DoubleEndedIterator<Item = f64> {
    let n = ((b - a).abs() / spacing).ceil().max(1.0) as usize;
    (0..=n).map(move |i| a + (b - a) * i as f64 / n as f64)
}

struct Sweep<'a> {
    map: &'a HeightMap,
    probe: &'a Probe,
    floor: f64,
    epsilon: f64,
    spacing: f64,
}

impl Sweep<'_> {
    fn tip(&self, x: f64, y: f64) -> Point3 {
        let z = (self.probe.required_height(self.map, x, y) + self.epsilon).max(self.floor);
        Point3::new(x, y, z)
    }

    /// Back-and-forth passes along X, stepping `stepover` along Y, over
    /// the map extent grown by `margin`.
    fn run(&self, stepover: f64, margin: f64) -> Vec<Point3> {
        let [bx0, by0, bx1, by1] = self.map.bounds;
        let (x0, x1) = (bx0 - margin, bx1 + margin);
        let (y0, y1) = (by0 - margin, by1 + margin);
        let ys: Vec<f64> = spaced(y0, y1, stepover).collect();

        let mut out = Vec::new();
        for (k, &y) in ys.iter().enumerate() {
            let forward = k % 2 == 0;
            let xs: Vec<f64> = if forward {
                spaced(x0, x1, self.spacing).collect()
            } else {
                spaced(x0, x1, self.spacing).rev().collect()
            };
            out.extend(xs.iter().map(|&x| self.tip(x, y)));

            if let Some(&next) = ys.get(k + 1) {
                let x = if forward { x1 } else { x0 };
                out.extend(spaced(y, next, self.spacing).skip(1).map(|yy| self.tip(x, yy)));
            }
        }
        out
    }
}

fn check_safe_z(map: &HeightMap, probe: &Probe, settings: &RoughingSettings) -> Result<()> {
    let top = map.max_height() + settings.safety_epsilon;
    if settings.safe_z < top {
        return Err(MillError::SafeHeightTooLow {
            safe_z: settings.safe_z,
            top,
        });
    }
    debug!(probe = probe.len(), top, "retract height checked");
    Ok(())
}

fn append_pass(path: &mut ToolPath, pass: &[Point3], safe_z: f64) {
    if let (Some(first), Some(last)) = (pass.first(), pass.last()) {
        path.push(Point3::new(first.x, first.y, safe_z));
        for p in pass {
            path.push(*p);
        }
        path.push(Point3::new(last.x, last.y, safe_z));
    }
}

/// Roughing path over a baked heightmap.
///
/// Each level, highest first, is swept back and forth at a stepover of
/// `step_factor` probe diameters. The probe is a paraboloid of
/// `probe_factor` times the cutter radius for ball cutters. Wherever the
/// probe would reach into the material, the tip is lifted to the
/// required height plus `safety_epsilon`. The path starts and ends at
/// `(0, 0, safe_z)` and retracts between levels.
pub fn rough(map: &HeightMap, cutter: &Cutter, settings: &RoughingSettings) -> Result<ToolPath> {
    cutter.validate()?;
    settings.validate()?;
    if settings.levels.is_empty() {
        return Err(MillError::NoLevels);
    }

    let radius = cutter.radius();
    let probe_radius = settings.probe_factor * radius;
    let probe = match cutter {
        Cutter::Ball { .. } => Probe::paraboloid(probe_radius, settings.probe_resolution),
        Cutter::Flat { .. } => Probe::flat(radius, settings.probe_resolution),
    };
    check_safe_z(map, &probe, settings)?;

    let mut levels = settings.levels.clone();
    levels.sort_by(|a, b| b.total_cmp(a));

    let stepover = settings.step_factor * 2.0 * probe_radius;
    let mut path = ToolPath::new(cutter.clone());
    path.push(Point3::new(0.0, 0.0, settings.safe_z));
    for &floor in &levels {
        let sweep = Sweep {
            map,
            probe: &probe,
            floor,
            epsilon: settings.safety_epsilon,
            spacing: settings.sample_spacing,
        };
        append_pass(&mut path, &sweep.run(stepover, radius), settings.safe_z);
    }
    path.push(Point3::new(0.0, 0.0, settings.safe_z));

    info!(
        cutter = %cutter.extension(),
        levels = levels.len(),
        points = path.len(),
        "roughing path generated"
    );
    Ok(path)
}

/// Finishing path: one sweep at `finish_stepover` that follows the
/// material down to the heightmap base with the exact tip shape.
pub fn finish(map: &HeightMap, cutter: &Cutter, settings: &RoughingSettings) -> Result<ToolPath> {
    cutter.validate()?;
    settings.validate()?;

    let radius = cutter.radius();
    let probe = match cutter {
        Cutter::Ball { .. } => Probe::sphere(radius, settings.probe_resolution),
        Cutter::Flat { .. } => Probe::flat(radius, settings.probe_resolution),
    };
    check_safe_z(map, &probe, settings)?;

    let sweep = Sweep {
        map,
        probe: &probe,
        floor: map.base,
        epsilon: settings.safety_epsilon,
        spacing: settings.sample_spacing,
    };
    let mut path = ToolPath::new(cutter.clone());
    path.push(Point3::new(0.0, 0.0, settings.safe_z));
    append_pass(&mut path, &sweep.run(settings.finish_stepover, radius), settings.safe_z);
    path.push(Point3::new(0.0, 0.0, settings.safe_z));

    info!(cutter = %cutter.extension(), points = path.len(), "finishing path generated");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 6×6 block with a 2×2 plateau of height 2 in the middle.
    fn plateau() -> HeightMap {
        let mut map = HeightMap::new(60, 60, [-3.0, -3.0, 3.0, 3.0], 0.0);
        for iy in 0..60 {
            for ix in 0..60 {
                let (x, y) = map.xy_at(ix, iy);
                if x.abs() < 1.0 && y.abs() < 1.0 {
                    map.set(ix, iy, 2.0);
                }
            }
        }
        map
    }

    fn settings() -> RoughingSettings {
        RoughingSettings::default()
            .with_safe_z(5.0)
            .with_levels(vec![1.0])
            .with_sample_spacing(0.1)
    }

    fn cutter() -> Cutter {
        Cutter::Ball { diameter: 0.5 }
    }

    #[test]
    fn test_paraboloid_on_flat_material() {
        let map = HeightMap::new(10, 10, [-1.0, -1.0, 1.0, 1.0], 0.5);
        let probe = Probe::paraboloid(0.2, 32);
        assert!(probe.len() > 700 && probe.len() < 1024);
        assert_eq!(probe.required_height(&map, 0.0, 0.0), 0.5);
    }

    #[test]
    fn test_sphere_near_step_lifts_less_than_full_height() {
        let map = plateau();
        let probe = Probe::sphere(0.5, 32);
        // Tip axis 0.3 outside the plateau edge.
        let z = probe.required_height(&map, 1.3, 0.0);
        assert!(z > 0.0 && z < 2.0, "z = {z}");
        assert_eq!(probe.required_height(&map, 0.0, 0.0), 2.0);
        assert_eq!(probe.required_height(&map, 2.5, 2.5), 0.0);
    }

    #[test]
    fn test_rough_clears_material() {
        let map = plateau();
        let s = settings();
        let path = rough(&map, &cutter(), &s).unwrap();
        let probe = Probe::paraboloid(0.8 * 0.25, 32);

        let points = path.points();
        assert_eq!(points.first(), Some(&Point3::new(0.0, 0.0, 5.0)));
        assert_eq!(points.last(), Some(&Point3::new(0.0, 0.0, 5.0)));
        for p in points {
            let need = probe.required_height(&map, p.x, p.y) + s.safety_epsilon;
            assert!(p.z >= need - 1e-9, "{p:?} below {need}");
            assert!(p.z >= 1.0);
        }
        assert!(points.iter().any(|p| p.z == 1.0));
        assert!(points.iter().any(|p| (p.z - 2.01).abs() < 1e-9));
    }

    #[test]
    fn test_rough_levels_descend() {
        let map = plateau();
        let s = settings().with_levels(vec![0.5, 1.5]);
        let path = rough(&map, &cutter(), &s).unwrap();
        let first_low = path.points().iter().position(|p| p.z == 0.5).unwrap();
        let last_high = path.points().iter().rposition(|p| p.z == 1.5).unwrap();
        assert!(last_high < first_low);
    }

    #[test]
    fn test_finish_follows_surface() {
        let map = plateau();
        let s = settings().with_finish_stepover(0.25).with_safety_epsilon(0.0);
        let path = finish(&map, &Cutter::Flat { diameter: 0.2 }, &s).unwrap();
        assert!(path.points().iter().any(|p| p.z == 0.0));
        assert!(path.points().iter().any(|p| p.z == 2.0));
        assert_eq!(path.file_name("finish"), "finish.f02");
    }

    #[test]
    fn test_invalid_settings() {
        let map = plateau();
        let none = settings().with_levels(vec![]);
        assert_eq!(rough(&map, &cutter(), &none), Err(MillError::NoLevels));
        let spacing = settings().with_sample_spacing(0.0);
        assert!(matches!(
            rough(&map, &cutter(), &spacing),
            Err(MillError::InvalidSetting { name: "sample_spacing", .. })
        ));
        let low = settings().with_safe_z(1.0);
        assert!(matches!(
            finish(&map, &cutter(), &low),
            Err(MillError::SafeHeightTooLow { .. })
        ));
        assert!(rough(&map, &Cutter::Ball { diameter: -1.0 }, &settings()).is_err());
    }
}
