//! Error types for document operations.

use patchwork_gaps::GapError;
use patchwork_mill::MillError;
use patchwork_spline::SurfaceError;
use patchwork_topo::TopoError;
use patchwork_trim::TrimError;
use thiserror::Error;

use crate::ObjectId;

/// Errors raised by [`Document`](crate::Document) operations and settings
/// loading.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The id does not name a live object.
    #[error("unknown object {0:?}")]
    UnknownObject(ObjectId),

    /// The object exists but has the wrong kind for the operation.
    #[error("object {id:?} is not a {expected}")]
    WrongKind {
        /// Offending object.
        id: ObjectId,
        /// What the operation needed.
        expected: &'static str,
    },

    /// A bicubic surface has no geometry because a control point is missing.
    #[error("surface {0:?} is not ready")]
    NotReady(ObjectId),

    /// The selection does not hold the number of surfaces required.
    #[error("expected {expected} selected surfaces, found {found}")]
    Selection {
        /// Required count.
        expected: usize,
        /// Selected surface count.
        found: usize,
    },

    /// Surface construction failed.
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    /// Control point operation failed.
    #[error(transparent)]
    Topo(#[from] TopoError),

    /// Gap filling failed.
    #[error(transparent)]
    Gap(#[from] GapError),

    /// Trimming raster setup failed.
    #[error(transparent)]
    Trim(#[from] TrimError),

    /// Milling path generation failed.
    #[error(transparent)]
    Mill(#[from] MillError),

    /// Reading a settings file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A settings file is not valid TOML for [`Settings`](crate::Settings).
    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;
