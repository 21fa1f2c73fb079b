//! Tool paths and their program text.

use patchwork_math::Point3;

use crate::Cutter;

/// Millimetres per model unit in emitted programs.
pub const MM_PER_UNIT: f64 = 10.0;

/// A model coordinate in millimetres with three decimals. Values that
/// round to zero print unsigned.
fn millimetres(value: f64) -> String {
    let mm = (value * MM_PER_UNIT * 1000.0).round() / 1000.0;
    format!("{:.3}", if mm == 0.0 { 0.0 } else { mm })
}

/// An ordered list of cutter tip positions in machine coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPath {
    /// Cutter that follows the path.
    pub cutter: Cutter,
    points: Vec<Point3>,
}

impl ToolPath {
    /// An empty path for `cutter`.
    pub fn new(cutter: Cutter) -> Self {
        Self {
            cutter,
            points: Vec::new(),
        }
    }

    /// Tip positions in order.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the path has no positions.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append a position.
    ///
    /// When the last two positions and `p` share a height and lie on one
    /// line heading the same way, the last position is moved to `p`
    /// instead of appending.
    pub fn push(&mut self, p: Point3) {
        if let [.., a, b] = self.points.as_slice() {
            let (ab, bp) = (b - a, p - b);
            let level = a.z == b.z && b.z == p.z;
            if level && ab.cross(&bp).norm() <= 1e-9 && ab.dot(&bp) >= 0.0 {
                if let Some(last) = self.points.last_mut() {
                    *last = p;
                }
                return;
            }
        }
        if self.points.last() != Some(&p) {
            self.points.push(p);
        }
    }

    /// Program file name for this path: `<stem>.<extension>`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.cutter.extension())
    }

    /// Program text: one numbered `G01` line per position, millimetres,
    /// three decimals.
    pub fn to_program(&self) -> String {
        let mut out = String::new();
        for (i, p) in self.points.iter().enumerate() {
            let (x, y, z) = (millimetres(p.x), millimetres(p.y), millimetres(p.z));
            out.push_str(&format!("N{}G01X{x}Y{y}Z{z}\n", i + 1));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millimetres() {
        assert_eq!(millimetres(0.1), "1.000");
        assert_eq!(millimetres(-0.05), "-0.500");
        assert_eq!(millimetres(12.345_67), "123.457");
        assert_eq!(millimetres(-0.000_01), "0.000");
    }

    #[test]
    fn test_collinear_level_points_merge() {
        let mut path = ToolPath::new(Cutter::default());
        path.push(Point3::new(0.0, 0.0, 1.0));
        path.push(Point3::new(1.0, 0.0, 1.0));
        path.push(Point3::new(2.0, 0.0, 1.0));
        path.push(Point3::new(3.0, 0.0, 1.0));
        assert_eq!(path.points(), &[Point3::new(0.0, 0.0, 1.0), Point3::new(3.0, 0.0, 1.0)]);
    }

    #[test]
    fn test_height_change_and_reversal_kept() {
        let mut path = ToolPath::new(Cutter::default());
        path.push(Point3::new(0.0, 0.0, 1.0));
        path.push(Point3::new(1.0, 0.0, 1.0));
        path.push(Point3::new(2.0, 0.0, 2.0));
        path.push(Point3::new(3.0, 0.0, 2.0));
        path.push(Point3::new(1.0, 0.0, 2.0));
        assert_eq!(path.len(), 5);
        path.push(Point3::new(1.0, 0.0, 2.0));
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_program_lines() {
        let mut path = ToolPath::new(Cutter::Ball { diameter: 1.6 });
        path.push(Point3::new(0.0, 0.0, 5.0));
        path.push(Point3::new(-1.25, 0.5, 0.1234));
        let text = path.to_program();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["N1G01X0.000Y0.000Z50.000", "N2G01X-12.500Y5.000Z1.234"]);
        assert_eq!(path.file_name("rough"), "rough.k16");
    }
}
