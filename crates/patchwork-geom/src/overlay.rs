//! Derivative debug overlay.
//!
//! Line segments visualising the normal (and optionally both partial
//! derivatives) over a regular parameter grid.

use patchwork_math::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::Surface;

/// Overlay sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Samples along u.
    pub res_u: usize,
    /// Samples along v.
    pub res_v: usize,
    /// Length multiplier applied to every drawn vector.
    pub scale: f64,
    /// Also draw the u and v derivative vectors.
    pub derivatives: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            res_u: 25,
            res_v: 25,
            scale: 0.1,
            derivatives: false,
        }
    }
}

/// Which vector a segment visualises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayChannel {
    /// Unit normal.
    Normal,
    /// Partial derivative along u.
    Du,
    /// Partial derivative along v.
    Dv,
}

/// One drawn vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySegment {
    /// Foot point on the surface.
    pub start: Point3,
    /// Tip of the scaled vector.
    pub end: Point3,
    /// What the segment shows.
    pub channel: OverlayChannel,
}

/// Segment list for a surface's derivative field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivativeOverlay {
    segments: Vec<OverlaySegment>,
}

impl DerivativeOverlay {
    /// Sample `surface` on a `res_u × res_v` grid starting at the domain
    /// minimum with step `extent / res`.
    pub fn build<S: Surface + ?Sized>(surface: &S, settings: &OverlaySettings) -> Self {
        let ((u0, u1), (v0, v1)) = surface.domain();
        let su = (u1 - u0) / settings.res_u.max(1) as f64;
        let sv = (v1 - v0) / settings.res_v.max(1) as f64;
        let per_sample = if settings.derivatives { 3 } else { 1 };
        let mut segments = Vec::with_capacity(settings.res_u * settings.res_v * per_sample);

        for iu in 0..settings.res_u {
            for iv in 0..settings.res_v {
                let uv = Point2::new(u0 + iu as f64 * su, v0 + iv as f64 * sv);
                let p = surface.evaluate(uv);
                segments.push(OverlaySegment {
                    start: p,
                    end: p + surface.normal(uv).into_inner() * settings.scale,
                    channel: OverlayChannel::Normal,
                });
                if settings.derivatives {
                    segments.push(OverlaySegment {
                        start: p,
                        end: p + surface.d_du(uv) * settings.scale,
                        channel: OverlayChannel::Du,
                    });
                    segments.push(OverlaySegment {
                        start: p,
                        end: p + surface.d_dv(uv) * settings.scale,
                        channel: OverlayChannel::Dv,
                    });
                }
            }
        }

        Self { segments }
    }

    /// All segments.
    pub fn segments(&self) -> &[OverlaySegment] {
        &self.segments
    }

    /// Flattened `[start, end, start, end, ...]` vertex list.
    pub fn line_list(&self) -> Vec<Point3> {
        self.segments.iter().flat_map(|s| [s.start, s.end]).collect()
    }
}
