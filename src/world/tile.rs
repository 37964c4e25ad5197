//! Tile surface capability and an in-memory implementation.

use crate::error::{Result, TerrainError};
use crate::grid::ScalarGrid;

/// A host terrain tile exposed to the world grid.
///
/// Heights are normalized to `[0, 1]` and addressed by cell `(x, z)` with
/// `x, z < resolution()`. `x` runs along world X and `z` along world Z.
/// The core never needs anything from the host beyond this capability set.
pub trait TileSurface {
    /// Cells per axis.
    fn resolution(&self) -> u32;

    /// World-space `(x, z)` of the tile's minimum corner.
    fn world_origin(&self) -> (f32, f32);

    /// World-space `(width, depth)` covered by the tile.
    fn world_size(&self) -> (f32, f32);

    fn get_height(&self, x: u32, z: u32) -> f32;

    fn set_height(&mut self, x: u32, z: u32, value: f32);

    /// Label used in log messages.
    fn name(&self) -> &str {
        "tile"
    }

    /// Number of texture (splat) layers painted on the tile.
    fn splat_layer_count(&self) -> usize {
        0
    }

    /// Cells per axis of the splat layers.
    fn splat_resolution(&self) -> u32 {
        self.resolution()
    }

    /// Weight of `layer` at splat cell `(x, z)` in `[0, 1]`.
    fn splat_weight(&self, _layer: usize, _x: u32, _z: u32) -> f32 {
        0.0
    }
}

/// A tile held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTile {
    name: String,
    origin: (f32, f32),
    size: (f32, f32),
    heights: ScalarGrid,
    splat_layers: Vec<ScalarGrid>,
}

impl MemoryTile {
    /// Creates a flat tile of `resolution x resolution` cells.
    pub fn new(name: impl Into<String>, origin: (f32, f32), size: (f32, f32), resolution: u32) -> Self {
        Self {
            name: name.into(),
            origin,
            size,
            heights: ScalarGrid::new(resolution, resolution),
            splat_layers: Vec::new(),
        }
    }

    /// Creates a tile from a square height grid.
    pub fn from_heights(
        name: impl Into<String>,
        origin: (f32, f32),
        size: (f32, f32),
        heights: ScalarGrid,
    ) -> Result<Self> {
        if heights.width() != heights.depth() {
            return Err(TerrainError::InvalidConfig(format!(
                "tile heights must be square, got {}x{}",
                heights.width(),
                heights.depth()
            )));
        }
        Ok(Self {
            name: name.into(),
            origin,
            size,
            heights,
            splat_layers: Vec::new(),
        })
    }

    /// Attaches splat layers; all layers must share one square resolution.
    pub fn with_splat_layers(mut self, layers: Vec<ScalarGrid>) -> Result<Self> {
        if let Some(first) = layers.first() {
            let dims = first.dimensions();
            if dims.0 != dims.1 {
                return Err(TerrainError::InvalidConfig(format!(
                    "splat layers must be square, got {}x{}",
                    dims.0, dims.1
                )));
            }
            if let Some(other) = layers.iter().find(|l| l.dimensions() != dims) {
                return Err(TerrainError::DimensionMismatch {
                    expected: dims,
                    found: other.dimensions(),
                });
            }
        }
        self.splat_layers = layers;
        Ok(self)
    }

    pub fn heights(&self) -> &ScalarGrid {
        &self.heights
    }

    pub fn heights_mut(&mut self) -> &mut ScalarGrid {
        &mut self.heights
    }

    /// Cuts a heightmap into `tiles_x * tiles_z` square tiles laid out on a
    /// regular world grid with spacing `tile_world_size`.
    pub fn split_grid(
        grid: &ScalarGrid,
        tiles_x: u32,
        tiles_z: u32,
        tile_world_size: f32,
    ) -> Result<Vec<MemoryTile>> {
        if tiles_x == 0 || tiles_z == 0 {
            return Err(TerrainError::InvalidConfig("tile counts must be positive".into()));
        }
        let (w, d) = grid.dimensions();
        if w % tiles_x != 0 || d % tiles_z != 0 || w / tiles_x != d / tiles_z {
            return Err(TerrainError::InvalidConfig(format!(
                "{}x{} grid cannot be split into {}x{} square tiles",
                w, d, tiles_x, tiles_z
            )));
        }
        let res = w / tiles_x;

        let mut tiles = Vec::with_capacity((tiles_x * tiles_z) as usize);
        for row in 0..tiles_z {
            for column in 0..tiles_x {
                let mut heights = ScalarGrid::new(res, res);
                for z in 0..res {
                    for x in 0..res {
                        heights.set_at(x, z, grid.at(column * res + x, row * res + z));
                    }
                }
                tiles.push(MemoryTile::from_heights(
                    format!("tile_{}_{}", column, row),
                    (column as f32 * tile_world_size, row as f32 * tile_world_size),
                    (tile_world_size, tile_world_size),
                    heights,
                )?);
            }
        }
        Ok(tiles)
    }
}

impl TileSurface for MemoryTile {
    fn resolution(&self) -> u32 {
        self.heights.width()
    }

    fn world_origin(&self) -> (f32, f32) {
        self.origin
    }

    fn world_size(&self) -> (f32, f32) {
        self.size
    }

    fn get_height(&self, x: u32, z: u32) -> f32 {
        self.heights.at(x, z)
    }

    fn set_height(&mut self, x: u32, z: u32, value: f32) {
        self.heights.set_at(x, z, value);
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn splat_layer_count(&self) -> usize {
        self.splat_layers.len()
    }

    fn splat_resolution(&self) -> u32 {
        self.splat_layers
            .first()
            .map(|l| l.width())
            .unwrap_or_else(|| self.resolution())
    }

    fn splat_weight(&self, layer: usize, x: u32, z: u32) -> f32 {
        self.splat_layers
            .get(layer)
            .map(|l| l.at(x, z))
            .unwrap_or(0.0)
    }
}
