//! World grid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Parameters for stitching tiles into one world heightfield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGridConfig {
    /// Required cells per axis for every tile. `None` adopts the first tile's resolution.
    pub tile_resolution: Option<u32>,
    /// World units represented by a normalized height of 1.0.
    pub max_terrain_height: f32,
}

impl Default for WorldGridConfig {
    fn default() -> Self {
        Self {
            tile_resolution: None,
            max_terrain_height: 600.0,
        }
    }
}

impl WorldGridConfig {
    pub fn with_tile_resolution(tile_resolution: u32) -> Self {
        Self {
            tile_resolution: Some(tile_resolution),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_resolution == Some(0) {
            return Err(TerrainError::InvalidConfig("tile_resolution must be positive".into()));
        }
        if !self.max_terrain_height.is_finite() || self.max_terrain_height < 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "max_terrain_height {} must be finite and >= 0",
                self.max_terrain_height
            )));
        }
        Ok(())
    }
}
