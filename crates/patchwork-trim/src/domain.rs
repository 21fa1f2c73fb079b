//! The trimming raster.

use patchwork_math::{Point2, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, TrimError};

/// State of one raster pixel.
///
/// The discriminants are the byte values of the exported mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrimState {
    /// Trimmed away.
    Hidden = 0,
    /// Boundary marker drawn by a trimming curve.
    Curve = 128,
    /// Part of the surface.
    Visible = 255,
}

impl TrimState {
    fn toggled(self) -> Self {
        match self {
            TrimState::Hidden => TrimState::Visible,
            TrimState::Visible => TrimState::Hidden,
            TrimState::Curve => TrimState::Curve,
        }
    }
}

/// Raster resolution used for new trimming domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimSettings {
    /// Pixels along u.
    pub width: usize,
    /// Pixels along v.
    pub height: usize,
}

impl Default for TrimSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

/// Tri-state visibility raster over a surface's parameter rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimDomain {
    width: usize,
    height: usize,
    pixels: Vec<TrimState>,
    range_u: (f64, f64),
    range_v: (f64, f64),
    wrap_u: bool,
    wrap_v: bool,
}

impl TrimDomain {
    /// Fully visible domain over `[0, 1]²`.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TrimError::EmptyRaster { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![TrimState::Visible; width * height],
            range_u: (0.0, 1.0),
            range_v: (0.0, 1.0),
            wrap_u: false,
            wrap_v: false,
        })
    }

    /// Domain sized from settings.
    pub fn from_settings(settings: &TrimSettings) -> Result<Self> {
        Self::new(settings.width, settings.height)
    }

    /// Set the parameter rectangle the raster spans.
    pub fn with_range(mut self, range_u: (f64, f64), range_v: (f64, f64)) -> Result<Self> {
        for (min, max) in [range_u, range_v] {
            if min.is_nan() || max.is_nan() || max <= min {
                return Err(TrimError::DegenerateRange { min, max });
            }
        }
        self.range_u = range_u;
        self.range_v = range_v;
        Ok(self)
    }

    /// Match the periodicity of the owning surface.
    pub fn with_wrap(mut self, wrap_u: bool, wrap_v: bool) -> Self {
        self.wrap_u = wrap_u;
        self.wrap_v = wrap_v;
        self
    }

    /// Raster width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    fn pixel_of(&self, uv: Point2) -> (i64, i64) {
        let nu = (uv.x - self.range_u.0) / (self.range_u.1 - self.range_u.0);
        let nv = (uv.y - self.range_v.0) / (self.range_v.1 - self.range_v.0);
        let px = ((nu * self.width as f64).floor() as i64).clamp(0, self.width as i64 - 1);
        let py = ((nv * self.height as f64).floor() as i64).clamp(0, self.height as i64 - 1);
        (px, py)
    }

    fn index(&self, x: i64, y: i64) -> usize {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        y * self.width + x
    }

    /// Pixel state with modular wraparound on both axes.
    pub fn at(&self, x: i64, y: i64) -> TrimState {
        self.pixels[self.index(x, y)]
    }

    /// Whether the surface point at parameters `(u, v)` is kept.
    ///
    /// Boundary pixels count as visible.
    pub fn is_visible(&self, u: f64, v: f64) -> bool {
        let (x, y) = self.pixel_of(Point2::new(u, v));
        self.at(x, y) != TrimState::Hidden
    }

    /// Scan-convert a parameter-space polyline into boundary pixels.
    pub fn trim_curve(&mut self, points: &[Point2]) {
        for pair in points.windows(2) {
            let (x0, y0) = self.pixel_of(pair[0]);
            let (mut x1, mut y1) = self.pixel_of(pair[1]);
            // Cross the seam of a periodic axis the short way around.
            if self.wrap_u {
                x1 = shortest_wrap(x0, x1, self.width as i64);
            }
            if self.wrap_v {
                y1 = shortest_wrap(y0, y1, self.height as i64);
            }
            self.draw_line(x0, y0, x1, y1, TrimState::Curve);
        }
        debug!(segments = points.len().saturating_sub(1), "trim curve drawn");
    }

    /// Scan-convert a polyline given as a start point and running offsets.
    pub fn trim_directions(&mut self, start: Point2, directions: &[Vec2]) {
        let mut points = Vec::with_capacity(directions.len() + 1);
        let mut current = start;
        points.push(current);
        for d in directions {
            current += *d;
            points.push(current);
        }
        self.trim_curve(&points);
    }

    /// Toggle the 4-connected region containing parameters `(u, v)`.
    ///
    /// The fill spreads through pixels with exactly the starting state, so
    /// boundary pixels stop it. Returns the number of toggled pixels; a
    /// click on a boundary pixel changes nothing.
    pub fn trim(&mut self, u: f64, v: f64) -> usize {
        let (x, y) = self.pixel_of(Point2::new(u, v));
        let source = self.at(x, y);
        if source == TrimState::Curve {
            return 0;
        }
        let target = source.toggled();

        let (w, h) = (self.width as i64, self.height as i64);
        let mut toggled = 0;
        let mut stack = vec![(x, y)];
        while let Some((cx, cy)) = stack.pop() {
            let idx = self.index(cx, cy);
            if self.pixels[idx] != source {
                continue;
            }
            self.pixels[idx] = target;
            toggled += 1;

            for (nx, ny) in [(cx + 1, cy), (cx - 1, cy), (cx, cy + 1), (cx, cy - 1)] {
                let inside_x = self.wrap_u || (0..w).contains(&nx);
                let inside_y = self.wrap_v || (0..h).contains(&ny);
                if inside_x && inside_y {
                    stack.push((nx.rem_euclid(w), ny.rem_euclid(h)));
                }
            }
        }

        debug!(toggled, to = ?target, "trim region filled");
        toggled
    }

    /// Make every pixel visible again.
    pub fn reset(&mut self) {
        self.pixels.fill(TrimState::Visible);
    }

    /// Row-major mask bytes.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.pixels.iter().map(|&p| p as u8).collect()
    }

    fn draw_line(&mut self, mut x0: i64, mut y0: i64, x1: i64, y1: i64, state: TrimState) {
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = (y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = (if dx > dy { dx } else { -dy }) / 2;

        loop {
            let idx = self.index(x0, y0);
            self.pixels[idx] = state;
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = err;
            if e2 > -dx {
                err -= dy;
                x0 += sx;
            }
            if e2 < dy {
                err += dx;
                y0 += sy;
            }
        }
    }
}

fn shortest_wrap(from: i64, to: i64, size: i64) -> i64 {
    let delta = to - from;
    if delta > size / 2 {
        to - size
    } else if delta < -size / 2 {
        to + size
    } else {
        to
    }
}
