//! Bundled tool configuration loaded from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::erosion::FlowSimulatorConfig;
use crate::error::{Result, TerrainError};
use crate::shoreline::ShorelineMaskerConfig;
use crate::world::WorldGridConfig;

/// Settings for every component, as read from a single JSON document.
///
/// Missing sections and fields fall back to their defaults, so `{}` is a
/// valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub world: WorldGridConfig,
    pub flow: FlowSimulatorConfig,
    pub shoreline: ShorelineMaskerConfig,
}

impl ToolConfig {
    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| TerrainError::io(path, source))?;
        let config = Self::from_json_str(&contents).map_err(|source| TerrainError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.world.validate()?;
        self.flow.validate()?;
        self.shoreline.validate()
    }
}
