#![warn(missing_docs)]

//! Milling path generation for the patchwork modeling kernel.
//!
//! Surfaces of a model are baked into a [`HeightMap`] in machine
//! coordinates (`X` = world x, `Y` = world z, height = -world y). A
//! ball-end [`Cutter`] then sweeps the block back and forth; at each
//! sample a [`Probe`] finds the lowest tip height that keeps the cutter
//! out of the material. [`ToolPath::to_program`] writes the result as
//! numbered linear moves.

mod cutter;
mod error;
mod heightmap;
mod program;
mod roughing;

pub use cutter::Cutter;
pub use error::{MillError, Result};
pub use heightmap::{BakeSettings, BakeTarget, HeightMap};
pub use program::{ToolPath, MM_PER_UNIT};
pub use roughing::{finish, rough, Probe, RoughingSettings};
