//! Multi-tile terrain heightfield processing.
//!
//! This crate stitches square terrain tiles into one world-space heightfield
//! and derives data products from it: droplet water-flow maps, shoreline
//! proximity masks, normal maps and splatmaps, exported as quantized PNG or
//! RAW images.

pub mod config;
pub mod erosion;
pub mod error;
pub mod export;
pub mod grid;
pub mod shoreline;
pub mod task;
pub mod world;

pub use config::ToolConfig;
pub use erosion::{FlowSimulator, FlowSimulatorConfig, SpawnOrder};
pub use error::{Result, TerrainError};
pub use export::{BitDepth, NormalMapOptions, PngOptions, RawFormat};
pub use grid::ScalarGrid;
pub use shoreline::{ShorelineMasker, ShorelineMaskerConfig};
pub use task::{BackgroundTask, Progress, TaskHandle, TaskMonitor};
pub use world::{MemoryTile, SplatLayers, TileSurface, WorldGrid, WorldGridConfig};
