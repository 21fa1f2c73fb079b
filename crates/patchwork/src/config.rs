//! Settings groups for every tunable algorithm.

use std::path::Path;

use patchwork_geom::OverlaySettings;
use patchwork_intersect::TraceSettings;
use patchwork_mill::{BakeSettings, Cutter, RoughingSettings};
use patchwork_trim::TrimSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// All document settings. Missing tables and keys take their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Derivative overlay sampling.
    pub overlay: OverlaySettings,
    /// Intersection seeding and marching.
    pub trace: TraceSettings,
    /// Trimming raster size.
    pub trim: TrimSettings,
    /// Heightmap baking.
    pub bake: BakeSettings,
    /// Roughing and finishing sweeps.
    pub roughing: RoughingSettings,
    /// Cutter used for generated paths.
    pub cutter: Cutter,
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML settings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }
}
