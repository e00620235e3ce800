use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Layout constants ────────────────────────────────────────────────
// These are part of the published format; changing any of them changes
// the geometry of every existing diagram.

/// Maximum width of the root system, in tiles.
pub const MAX_SYSTEM_WIDTH: i32 = 64;
/// Maximum height of the root system, in tiles.
pub const MAX_SYSTEM_HEIGHT: i32 = 64;
/// Thickness of the impassable ring painted around every box.
pub const SYSTEM_MARGIN: i32 = 1;
/// Offset applied to a white-box's children on both axes.
pub const PADDING_WHITE_BOX: i32 = 2;
/// Characters carried by one title glyph tile.
pub const TITLE_CHARS_PER_SQUARE: usize = 2;
/// Boundary inflation, per side, applied when projecting the world
/// bounding rectangle onto the raster grid.
pub const BOUNDARY_INFLATION: i32 = SYSTEM_MARGIN * 5;

/// Tunable routing parameters. The defaults reproduce the reference
/// geometry; both knobs exist for experimentation, not per-diagram use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulatorConfig {
    /// Multiplier applied to the Manhattan heuristic.
    pub route_weight: f64,
    /// Cost added when a path step changes direction.
    pub turn_penalty: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            route_weight: 1.0,
            turn_penalty: 1.0,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<SimulatorConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        None => Ok(SimulatorConfig::default()),
    }
}
