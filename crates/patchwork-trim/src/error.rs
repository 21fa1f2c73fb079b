//! Error types for trimming domains.

use thiserror::Error;

/// Errors raised when configuring a trimming domain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrimError {
    /// The raster needs at least one pixel per axis.
    #[error("trim domain must be at least 1x1, got {width}x{height}")]
    EmptyRaster {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// A parameter range has no extent.
    #[error("degenerate parameter range [{min}, {max}]")]
    DegenerateRange {
        /// Range start.
        min: f64,
        /// Range end.
        max: f64,
    },
}

/// Result type for trimming operations.
pub type Result<T> = std::result::Result<T, TrimError>;
