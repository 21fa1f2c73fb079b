//! Cutter definitions.

use serde::{Deserialize, Serialize};

use crate::program::MM_PER_UNIT;
use crate::{MillError, Result};

/// A milling cutter, sized in model units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Cutter {
    /// Ball end mill.
    Ball {
        /// Tool diameter.
        diameter: f64,
    },
    /// Flat end mill.
    Flat {
        /// Tool diameter.
        diameter: f64,
    },
}

impl Cutter {
    /// Cutting diameter.
    pub fn diameter(&self) -> f64 {
        match self {
            Cutter::Ball { diameter } | Cutter::Flat { diameter } => *diameter,
        }
    }

    /// Cutting radius.
    pub fn radius(&self) -> f64 {
        self.diameter() / 2.0
    }

    /// Reject non-positive or non-finite diameters.
    pub fn validate(&self) -> Result<()> {
        let d = self.diameter();
        if !d.is_finite() || d <= 0.0 {
            return Err(MillError::InvalidCutter(d));
        }
        Ok(())
    }

    /// Program file extension: `k` for ball, `f` for flat, then the
    /// diameter in millimetres (`k16`, `f10`).
    pub fn extension(&self) -> String {
        let letter = match self {
            Cutter::Ball { .. } => 'k',
            Cutter::Flat { .. } => 'f',
        };
        format!("{letter}{:02}", (self.diameter() * MM_PER_UNIT).round() as u32)
    }
}

impl Default for Cutter {
    fn default() -> Self {
        Cutter::Ball { diameter: 1.6 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(Cutter::Ball { diameter: 1.6 }.extension(), "k16");
        assert_eq!(Cutter::Flat { diameter: 1.0 }.extension(), "f10");
        assert_eq!(Cutter::Ball { diameter: 0.8 }.extension(), "k08");
    }

    #[test]
    fn test_validate() {
        assert!(Cutter::default().validate().is_ok());
        assert_eq!(
            Cutter::Flat { diameter: 0.0 }.validate(),
            Err(MillError::InvalidCutter(0.0))
        );
        assert!(Cutter::Ball { diameter: f64::NAN }.validate().is_err());
    }

    #[test]
    fn test_radius() {
        assert!((Cutter::Ball { diameter: 1.6 }.radius() - 0.8).abs() < 1e-12);
    }
}
