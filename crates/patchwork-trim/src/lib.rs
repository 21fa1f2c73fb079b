#![warn(missing_docs)]

//! Rasterized trimming domains for the patchwork modeling kernel.
//!
//! A [`TrimDomain`] covers the parameter rectangle of one surface with a
//! fixed grid of tri-state pixels. Boundary curves are scan-converted into
//! [`TrimState::Curve`] pixels; a flood fill then toggles a whole region
//! between visible and hidden, stopping at the drawn boundary.

mod domain;
mod error;

pub use domain::{TrimDomain, TrimSettings, TrimState};
pub use error::{Result, TrimError};
