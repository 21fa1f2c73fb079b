//! Error types for milling path generation.

use thiserror::Error;

/// Errors raised by invalid milling configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MillError {
    /// Sampling or raster resolution too small.
    #[error("invalid bake resolution: {samples} samples, {resolution} cells")]
    InvalidResolution {
        /// Parameter samples per direction.
        samples: usize,
        /// Heightmap cells per axis.
        resolution: usize,
    },

    /// The heightmap extent is empty or not finite.
    #[error("invalid heightmap extent {0:?}")]
    InvalidExtent([f64; 4]),

    /// The cutter diameter is not a positive finite number.
    #[error("invalid cutter diameter: {0}")]
    InvalidCutter(f64),

    /// Path spacing parameters must be positive.
    #[error("invalid path setting {name}: {value}")]
    InvalidSetting {
        /// Setting name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Roughing needs at least one cutting level.
    #[error("roughing needs at least one level")]
    NoLevels,

    /// The retract height would cut into the material.
    #[error("safe height {safe_z} is below the material top {top}")]
    SafeHeightTooLow {
        /// Configured retract height.
        safe_z: f64,
        /// Highest tool position required by the heightmap.
        top: f64,
    },
}

/// Result type for milling operations.
pub type Result<T> = std::result::Result<T, MillError>;
