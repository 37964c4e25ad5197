//! Multi-tile world heightfield.
//!
//! Tiles are host terrain surfaces behind the [`TileSurface`] capability. A
//! [`WorldGrid`] arranges them by world origin, loads them into one composite
//! [`ScalarGrid`](crate::grid::ScalarGrid), and writes edits back with seam
//! continuity.

mod config;
mod grid;
mod tile;

pub use config::WorldGridConfig;
pub use grid::{SplatLayers, WorldGrid};
pub use tile::{MemoryTile, TileSurface};
