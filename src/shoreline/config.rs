//! Shoreline mask configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Parameters for the shoreline proximity mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShorelineMaskerConfig {
    /// Normalized height of the water line.
    pub sea_level: f32,
    /// Falloff radius in cells.
    pub mask_size: u32,
    /// Value assigned to dry cells.
    pub above_water_strength: f32,
    /// Heights within this distance of `sea_level` are shoreline sources.
    pub sea_level_epsilon: f32,
    /// Also treat submerged cells with a dry 4-neighbour as sources.
    pub include_boundary_cells: bool,
    /// Reverse row order of the finished mask to match image conventions.
    pub flip_output: bool,
}

impl Default for ShorelineMaskerConfig {
    fn default() -> Self {
        Self {
            sea_level: 0.1,
            mask_size: 8,
            above_water_strength: 1.0,
            sea_level_epsilon: 1e-4,
            include_boundary_cells: true,
            flip_output: false,
        }
    }
}

impl ShorelineMaskerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.sea_level.is_finite() {
            return Err(TerrainError::InvalidConfig(format!(
                "sea_level {} must be finite",
                self.sea_level
            )));
        }
        if !(0.0..=1.0).contains(&self.above_water_strength) {
            return Err(TerrainError::InvalidConfig(format!(
                "above_water_strength {} must be in [0, 1]",
                self.above_water_strength
            )));
        }
        if !(self.sea_level_epsilon >= 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "sea_level_epsilon {} must be >= 0",
                self.sea_level_epsilon
            )));
        }
        Ok(())
    }
}
