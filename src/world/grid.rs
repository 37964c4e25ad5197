//! A set of tiles presented as one world-space heightfield.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::config::WorldGridConfig;
use super::tile::TileSurface;
use crate::erosion::FlowSimulator;
use crate::error::{Result, TerrainError};
use crate::export::{
    export_normal_map_png, export_raw, write_channels_png, write_grid_png, NormalMapOptions,
    PngOptions, RawFormat, MAX_CHANNELS,
};
use crate::grid::ScalarGrid;
use crate::shoreline::ShorelineMasker;
use crate::task::{check_cancelled, Progress, Silent, TaskMonitor};

/// Which splat layers to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplatLayers {
    /// One layer as a single-channel image.
    Single(usize),
    /// Up to four layers packed as channels.
    All,
}

/// Largest composite (and slot table) the grid will allocate, in cells.
const MAX_COMPOSITE_CELLS: u64 = 1 << 28;

/// Placement of tiles on the world grid. Column = world-X bucket, row = world-Z bucket.
#[derive(Debug, Clone)]
struct TileLayout {
    columns: u32,
    rows: u32,
    /// Tile index per slot, row-major; `None` marks a hole.
    slots: Vec<Option<usize>>,
    /// `(column, row)` per tile.
    placements: Vec<(u32, u32)>,
    origin: (f32, f32),
    tile_size: (f32, f32),
}

impl TileLayout {
    fn infer<T: TileSurface>(tiles: &[T]) -> Result<Self> {
        let first = tiles.first().ok_or(TerrainError::NoActiveSurface)?;
        let tile_size = first.world_size();
        if !(tile_size.0 > 0.0 && tile_size.1 > 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "tile '{}' has non-positive world size {:?}",
                first.name(),
                tile_size
            )));
        }

        let origin = tiles.iter().fold((f32::MAX, f32::MAX), |(mx, mz), t| {
            let (x, z) = t.world_origin();
            (mx.min(x), mz.min(z))
        });

        let placements: Vec<(u32, u32)> = tiles
            .iter()
            .map(|t| {
                let (x, z) = t.world_origin();
                let column = ((x - origin.0) / tile_size.0).round().max(0.0) as u32;
                let row = ((z - origin.1) / tile_size.1).round().max(0.0) as u32;
                (column, row)
            })
            .collect();

        let span = |max: Option<u32>| max.unwrap_or(0).checked_add(1);
        let (Some(columns), Some(rows)) = (
            span(placements.iter().map(|p| p.0).max()),
            span(placements.iter().map(|p| p.1).max()),
        ) else {
            return Err(too_large(u64::MAX));
        };
        let slot_count = columns as u64 * rows as u64;
        if slot_count > MAX_COMPOSITE_CELLS {
            return Err(too_large(slot_count));
        }

        let mut slots = vec![None; slot_count as usize];
        for (i, &(column, row)) in placements.iter().enumerate() {
            let slot = &mut slots[row as usize * columns as usize + column as usize];
            if slot.is_some() {
                return Err(TerrainError::OverlappingTiles { column, row });
            }
            *slot = Some(i);
        }

        Ok(Self {
            columns,
            rows,
            slots,
            placements,
            origin,
            tile_size,
        })
    }

    fn slot(&self, column: u32, row: u32) -> Option<usize> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.slots[row as usize * self.columns as usize + column as usize]
    }

    /// Composite `(width, depth)` for tiles of `res` cells per axis.
    fn composite_dimensions(&self, res: u32) -> Result<(u32, u32)> {
        let width = res.checked_mul(self.columns);
        let depth = res.checked_mul(self.rows);
        match (width, depth) {
            (Some(w), Some(d)) if (w as u64) * (d as u64) <= MAX_COMPOSITE_CELLS => Ok((w, d)),
            _ => Err(too_large(
                (res as u64 * self.columns as u64).saturating_mul(res as u64 * self.rows as u64),
            )),
        }
    }

    fn has_tile(&self, column: u32, row: u32) -> bool {
        self.slot(column, row).is_some()
    }
}

fn too_large(cells: u64) -> TerrainError {
    TerrainError::InvalidConfig(format!(
        "tile layout needs {} cells, more than the limit of {}",
        cells, MAX_COMPOSITE_CELLS
    ))
}

/// Applies `combine` to every seam pair `(a, b)` where `a` is the east/north
/// border cell of one tile and `b` the west/south border cell of its neighbour.
/// West seams are visited before south seams.
fn for_each_seam<F>(grid: &mut ScalarGrid, layout: &TileLayout, res: u32, mut combine: F)
where
    F: FnMut(f32, f32) -> (f32, f32),
{
    for row in 0..layout.rows {
        for column in 1..layout.columns {
            if !(layout.has_tile(column, row) && layout.has_tile(column - 1, row)) {
                continue;
            }
            let bx = column * res;
            for z in row * res..(row + 1) * res {
                let (a, b) = combine(grid.at(bx - 1, z), grid.at(bx, z));
                grid.set_at(bx - 1, z, a);
                grid.set_at(bx, z, b);
            }
        }
    }
    for row in 1..layout.rows {
        for column in 0..layout.columns {
            if !(layout.has_tile(column, row) && layout.has_tile(column, row - 1)) {
                continue;
            }
            let bz = row * res;
            for x in column * res..(column + 1) * res {
                let (a, b) = combine(grid.at(x, bz - 1), grid.at(x, bz));
                grid.set_at(x, bz - 1, a);
                grid.set_at(x, bz, b);
            }
        }
    }
}

/// Multiple tile surfaces addressed as one heightfield.
///
/// The composite is `resolution * columns` cells wide and `resolution * rows`
/// deep. Edits are made to the in-memory composite and committed with
/// [`WorldGrid::save_to_world`]. A `WorldGrid` is owned by one operation at a
/// time; it provides no internal locking.
pub struct WorldGrid<T: TileSurface> {
    tiles: Vec<T>,
    config: WorldGridConfig,
    layout: TileLayout,
    heights: ScalarGrid,
}

impl<T: TileSurface> WorldGrid<T> {
    /// Arranges `tiles` by their world origins. Fails with `NoActiveSurface` if empty.
    pub fn new(tiles: Vec<T>, config: WorldGridConfig) -> Result<Self> {
        config.validate()?;
        let layout = TileLayout::infer(&tiles)?;
        let res = config
            .tile_resolution
            .unwrap_or_else(|| tiles[0].resolution());
        let (width, depth) = layout.composite_dimensions(res)?;
        let heights = ScalarGrid::new(width, depth);

        tracing::debug!(
            tiles = tiles.len(),
            columns = layout.columns,
            rows = layout.rows,
            resolution = res,
            "world grid created"
        );
        Ok(Self {
            tiles,
            config,
            layout,
            heights,
        })
    }

    /// Creates the grid and immediately loads heights from the tiles.
    pub fn load(tiles: Vec<T>, config: WorldGridConfig) -> Result<Self> {
        let mut world = Self::new(tiles, config)?;
        world.load_from_world()?;
        Ok(world)
    }

    pub fn config(&self) -> &WorldGridConfig {
        &self.config
    }

    /// Cells per axis every tile must have.
    pub fn tile_resolution(&self) -> u32 {
        self.config
            .tile_resolution
            .unwrap_or_else(|| self.tiles[0].resolution())
    }

    pub fn columns(&self) -> u32 {
        self.layout.columns
    }

    pub fn rows(&self) -> u32 {
        self.layout.rows
    }

    /// `(column, row)` of tile `index`.
    pub fn placement(&self, index: usize) -> Option<(u32, u32)> {
        self.layout.placements.get(index).copied()
    }

    pub fn tiles(&self) -> &[T] {
        &self.tiles
    }

    pub fn into_tiles(self) -> Vec<T> {
        self.tiles
    }

    /// The in-memory composite heightfield.
    pub fn heights(&self) -> &ScalarGrid {
        &self.heights
    }

    /// Mutable composite; changes reach the tiles on the next save.
    pub fn heights_mut(&mut self) -> &mut ScalarGrid {
        &mut self.heights
    }

    /// Converts a world position into fractional composite cell coordinates.
    pub fn world_to_cell(&self, world_x: f32, world_z: f32) -> (f32, f32) {
        let res = self.tile_resolution() as f32;
        let (ox, oz) = self.layout.origin;
        let (sx, sz) = self.layout.tile_size;
        ((world_x - ox) / sx * res, (world_z - oz) / sz * res)
    }

    /// Bilinear height at a world position, or `None` outside the world.
    pub fn height_at_world(&self, world_x: f32, world_z: f32) -> Option<f32> {
        let (fx, fz) = self.world_to_cell(world_x, world_z);
        let (w, d) = self.heights.dimensions();
        if w == 0 || d == 0 {
            return None;
        }
        if fx < 0.0 || fz < 0.0 || fx > (w - 1) as f32 || fz > (d - 1) as f32 {
            return None;
        }
        Some(self.heights.sample_bilinear(fx, fz))
    }

    /// Checks every tile against the expected resolution.
    fn validate_resolutions(&self) -> Result<u32> {
        let expected = self.tile_resolution();
        if let Some(tile) = self.tiles.iter().find(|t| t.resolution() != expected) {
            let found = tile.resolution();
            tracing::error!(tile = tile.name(), expected, found, "tile resolution mismatch");
            return Err(TerrainError::DimensionMismatch {
                expected: (expected, expected),
                found: (found, found),
            });
        }
        Ok(expected)
    }

    /// Samples every tile into the composite.
    pub fn load_from_world(&mut self) -> Result<()> {
        self.load_from_world_with(&Silent)
    }

    /// [`WorldGrid::load_from_world`] with progress and cancellation.
    ///
    /// The composite is replaced only when every tile has been read. Holes in
    /// the layout are logged and left at zero.
    pub fn load_from_world_with(&mut self, monitor: &dyn TaskMonitor) -> Result<()> {
        let res = self.validate_resolutions()?;
        let layout = &self.layout;
        let (width, depth) = layout.composite_dimensions(res)?;
        let mut composite = ScalarGrid::new(width, depth);
        let total = layout.slots.len();

        for row in 0..layout.rows {
            for column in 0..layout.columns {
                check_cancelled(monitor)?;
                let Some(index) = layout.slot(column, row) else {
                    tracing::warn!(column, row, "no tile at world slot; region left at zero");
                    continue;
                };
                let tile = &self.tiles[index];
                for z in 0..res {
                    for x in 0..res {
                        composite.set_at(column * res + x, row * res + z, tile.get_height(x, z));
                    }
                }
                monitor.on_progress(Progress {
                    stage: "load",
                    completed: (row * layout.columns + column + 1) as usize,
                    total,
                });
            }
        }

        self.heights = composite;
        tracing::info!(
            width = self.heights.width(),
            depth = self.heights.depth(),
            tiles = self.tiles.len(),
            "loaded world heightfield"
        );
        Ok(())
    }

    /// Makes shared tile borders agree in the composite.
    ///
    /// The west/south tile of each seam pair is authoritative; its border value
    /// is copied onto the neighbour's border cell.
    pub fn stitch_seams(&mut self) {
        let res = self.tile_resolution();
        match self.layout.composite_dimensions(res) {
            Ok(dims) if dims == self.heights.dimensions() => {}
            _ => return,
        }
        for_each_seam(&mut self.heights, &self.layout, res, |a, _| (a, a));
    }

    /// Writes the composite back to every tile, cell for cell.
    pub fn save_to_world(&mut self) -> Result<()> {
        self.save_to_world_with(&Silent)
    }

    /// [`WorldGrid::save_to_world`] with progress and cancellation.
    ///
    /// Seams are stitched first so adjacent tiles receive identical border
    /// values. Cancellation is honoured only before the first tile is written.
    pub fn save_to_world_with(&mut self, monitor: &dyn TaskMonitor) -> Result<()> {
        let res = self.validate_resolutions()?;
        let expected = self.layout.composite_dimensions(res)?;
        if self.heights.dimensions() != expected {
            return Err(TerrainError::DimensionMismatch {
                expected,
                found: self.heights.dimensions(),
            });
        }
        check_cancelled(monitor)?;
        self.stitch_seams();

        let total = self.tiles.len();
        for (index, tile) in self.tiles.iter_mut().enumerate() {
            let (column, row) = self.layout.placements[index];
            for z in 0..res {
                for x in 0..res {
                    tile.set_height(x, z, self.heights.at(column * res + x, row * res + z));
                }
            }
            monitor.on_progress(Progress {
                stage: "save",
                completed: index + 1,
                total,
            });
        }
        tracing::info!(tiles = total, "saved world heightfield to tiles");
        Ok(())
    }

    /// Rescales all heights so the tallest point equals `target_height` world units.
    ///
    /// Every height is multiplied by `target_height / previous_max`. A world
    /// with zero maximum height (or zero `max_terrain_height`) is left as is.
    /// Only the composite changes; call [`WorldGrid::save_to_world`] to commit.
    pub fn set_height_world_units(&mut self, target_height: f32) -> Result<()> {
        if !target_height.is_finite() || target_height < 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "target height {} must be finite and >= 0",
                target_height
            )));
        }
        let (_, max) = self.heights.min_max();
        let previous_max = max * self.config.max_terrain_height;
        if !(previous_max > 0.0) {
            tracing::debug!(previous_max, "nothing to rescale");
            return Ok(());
        }

        let factor = target_height / previous_max;
        self.heights.scale(factor);
        let new_max = max * factor;
        if new_max > 1.0 {
            tracing::warn!(
                target_height,
                max_terrain_height = self.config.max_terrain_height,
                "rescaled heights exceed the normalized range"
            );
        }
        tracing::info!(previous_max, target_height, factor, "rescaled world heights");
        Ok(())
    }

    /// Composes per-cell splat weights for the requested layers across all tiles.
    ///
    /// Splat resolution must be identical across tiles. Seam pairs are averaged.
    pub fn compose_splat_layers(&self, layers: SplatLayers) -> Result<Vec<ScalarGrid>> {
        self.validate_resolutions()?;
        let splat_res = self.tiles[0].splat_resolution();
        if let Some(tile) = self.tiles.iter().find(|t| t.splat_resolution() != splat_res) {
            return Err(TerrainError::DimensionMismatch {
                expected: (splat_res, splat_res),
                found: (tile.splat_resolution(), tile.splat_resolution()),
            });
        }
        let available = self
            .tiles
            .iter()
            .map(|t| t.splat_layer_count())
            .max()
            .unwrap_or(0);

        let selected: Vec<usize> = match layers {
            SplatLayers::Single(layer) => {
                if layer >= available {
                    return Err(TerrainError::InvalidConfig(format!(
                        "splat layer {} requested but tiles have {}",
                        layer, available
                    )));
                }
                vec![layer]
            }
            SplatLayers::All => {
                if available == 0 {
                    return Err(TerrainError::InvalidConfig("tiles have no splat layers".into()));
                }
                if available > MAX_CHANNELS {
                    tracing::warn!(available, kept = MAX_CHANNELS, "only the first splat layers fit in one image");
                }
                (0..available.min(MAX_CHANNELS)).collect()
            }
        };

        let (width, depth) = self.layout.composite_dimensions(splat_res)?;
        let mut grids = Vec::with_capacity(selected.len());
        for &layer in &selected {
            let mut grid = ScalarGrid::new(width, depth);
            for (index, tile) in self.tiles.iter().enumerate() {
                if layer >= tile.splat_layer_count() {
                    tracing::warn!(tile = tile.name(), layer, "tile lacks splat layer; left at zero");
                    continue;
                }
                let (column, row) = self.layout.placements[index];
                for z in 0..splat_res {
                    for x in 0..splat_res {
                        grid.set_at(
                            column * splat_res + x,
                            row * splat_res + z,
                            tile.splat_weight(layer, x, z),
                        );
                    }
                }
            }
            for_each_seam(&mut grid, &self.layout, splat_res, |a, b| {
                let mean = (a + b) * 0.5;
                (mean, mean)
            });
            grids.push(grid);
        }
        Ok(grids)
    }

    /// Exports splat weights as a PNG (one channel, or up to four packed).
    pub fn export_splatmap_png(
        &self,
        path: &Path,
        layers: SplatLayers,
        options: &PngOptions,
    ) -> Result<PathBuf> {
        let grids = self.compose_splat_layers(layers)?;
        let refs: Vec<&ScalarGrid> = grids.iter().collect();
        let written = write_channels_png(&refs, path, options)?;
        tracing::info!(path = %written.display(), channels = refs.len(), "exported splatmap");
        Ok(written)
    }

    /// Exports the composite's normal map as an RGB PNG.
    pub fn export_normalmap_png(&self, path: &Path, options: &NormalMapOptions) -> Result<PathBuf> {
        self.validate_resolutions()?;
        let written = export_normal_map_png(&self.heights, path, options)?;
        tracing::info!(path = %written.display(), "exported normal map");
        Ok(written)
    }

    /// Runs `simulator` on the composite, smooths and normalizes the flow map,
    /// and writes it as a grayscale PNG.
    pub fn export_waterflow_map_png(
        &self,
        simulator: &FlowSimulator,
        smooth_iterations: u32,
        path: &Path,
        options: &PngOptions,
    ) -> Result<PathBuf> {
        self.export_waterflow_map_png_with(simulator, smooth_iterations, path, options, &Silent)
    }

    /// [`WorldGrid::export_waterflow_map_png`] with progress and cancellation.
    pub fn export_waterflow_map_png_with(
        &self,
        simulator: &FlowSimulator,
        smooth_iterations: u32,
        path: &Path,
        options: &PngOptions,
        monitor: &dyn TaskMonitor,
    ) -> Result<PathBuf> {
        self.validate_resolutions()?;
        let mut flow = self.waterflow_map(simulator, monitor)?;
        flow.smooth(smooth_iterations);
        flow.normalize();
        let written = write_grid_png(&flow, path, options)?;
        tracing::info!(path = %written.display(), smooth_iterations, "exported waterflow map");
        Ok(written)
    }

    /// Unnormalized flow map of the composite using a seeded single-threaded run.
    pub fn waterflow_map(&self, simulator: &FlowSimulator, monitor: &dyn TaskMonitor) -> Result<ScalarGrid> {
        let mut rng = ChaCha8Rng::seed_from_u64(simulator.config().seed);
        Ok(simulator.run(&self.heights, &mut rng, monitor)?.flow)
    }

    /// Builds the shoreline mask of the composite and writes it as a grayscale PNG.
    pub fn export_shoreline_mask_png(
        &self,
        masker: &ShorelineMasker,
        path: &Path,
        options: &PngOptions,
    ) -> Result<PathBuf> {
        self.validate_resolutions()?;
        let mask = masker.build_mask(&self.heights);
        let written = write_grid_png(&mask, path, options)?;
        tracing::info!(path = %written.display(), "exported shoreline mask");
        Ok(written)
    }

    /// Writes the composite heightfield as a grayscale PNG.
    pub fn export_heightmap_png(&self, path: &Path, options: &PngOptions) -> Result<PathBuf> {
        self.validate_resolutions()?;
        write_grid_png(&self.heights, path, options)
    }

    /// Writes the composite heightfield as a RAW file.
    pub fn export_heightmap_raw(&self, path: &Path, format: RawFormat) -> Result<PathBuf> {
        self.validate_resolutions()?;
        export_raw(&self.heights, path, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erosion::FlowSimulatorConfig;
    use crate::export::{read_png, read_png_grids};
    use crate::world::MemoryTile;
    use tempfile::tempdir;

    fn tile(column: u32, row: u32, res: u32, fill: f32) -> MemoryTile {
        let mut t = MemoryTile::new(
            format!("t{}{}", column, row),
            (column as f32 * 50.0, row as f32 * 50.0),
            (50.0, 50.0),
            res,
        );
        t.heights_mut().fill(fill);
        t
    }

    fn sloped_world(columns: u32, rows: u32, res: u32) -> WorldGrid<MemoryTile> {
        let (w, d) = (columns * res, rows * res);
        let mut grid = ScalarGrid::new(w, d);
        for (x, z) in grid.cell_coords().collect::<Vec<_>>() {
            grid.set_at(x, z, (x + 2 * z) as f32 / (w + 2 * d) as f32);
        }
        let tiles = MemoryTile::split_grid(&grid, columns, rows, 50.0).unwrap();
        WorldGrid::load(tiles, WorldGridConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_tile_set_is_no_active_surface() {
        let result = WorldGrid::<MemoryTile>::new(Vec::new(), WorldGridConfig::default());
        assert!(matches!(result, Err(TerrainError::NoActiveSurface)));
    }

    #[test]
    fn test_layout_from_world_origins() {
        // Supplied out of order; offset origin.
        let tiles = vec![tile(1, 1, 4, 0.4), tile(0, 0, 4, 0.1), tile(1, 0, 4, 0.2), tile(0, 1, 4, 0.3)];
        let world = WorldGrid::load(tiles, WorldGridConfig::default()).unwrap();
        assert_eq!((world.columns(), world.rows()), (2, 2));
        assert_eq!(world.heights().dimensions(), (8, 8));
        assert_eq!(world.heights().at(0, 0), 0.1);
        assert_eq!(world.heights().at(5, 0), 0.2);
        assert_eq!(world.heights().at(0, 5), 0.3);
        assert_eq!(world.heights().at(7, 7), 0.4);
        assert_eq!(world.placement(0), Some((1, 1)));
    }

    #[test]
    fn test_far_apart_tiles_rejected_without_panicking() {
        let near = MemoryTile::new("near", (0.0, 0.0), (1.0, 1.0), 4);
        let far = MemoryTile::new("far", (70000.0, 70000.0), (1.0, 1.0), 4);
        assert!(matches!(
            WorldGrid::new(vec![near, far], WorldGridConfig::default()),
            Err(TerrainError::InvalidConfig(_))
        ));

        let far = MemoryTile::new("far", (f32::MAX, 0.0), (1.0, 1.0), 4);
        let near = MemoryTile::new("near", (0.0, 0.0), (1.0, 1.0), 4);
        assert!(WorldGrid::new(vec![near, far], WorldGridConfig::default()).is_err());
    }

    #[test]
    fn test_oversized_composite_rejected() {
        let tiles = vec![tile(0, 0, 4, 0.0), tile(1, 0, 4, 0.0)];
        let config = WorldGridConfig::with_tile_resolution(1 << 20);
        assert!(matches!(
            WorldGrid::new(tiles, config),
            Err(TerrainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_sparse_layout_within_limit_loads() {
        let tiles = vec![tile(0, 0, 4, 0.5), tile(5, 0, 4, 0.25)];
        let world = WorldGrid::load(tiles, WorldGridConfig::default()).unwrap();
        assert_eq!(world.heights().dimensions(), (24, 4));
        assert_eq!(world.heights().at(10, 2), 0.0);
        assert_eq!(world.heights().at(21, 2), 0.25);
    }

    #[test]
    fn test_overlapping_tiles_rejected() {
        let tiles = vec![tile(0, 0, 4, 0.0), tile(0, 0, 4, 0.0)];
        assert!(matches!(
            WorldGrid::new(tiles, WorldGridConfig::default()),
            Err(TerrainError::OverlappingTiles { column: 0, row: 0 })
        ));
    }

    #[test]
    fn test_missing_tile_region_defaults_to_zero() {
        let tiles = vec![tile(0, 0, 4, 0.5), tile(1, 1, 4, 0.7)];
        let world = WorldGrid::load(tiles, WorldGridConfig::default()).unwrap();
        assert_eq!(world.heights().dimensions(), (8, 8));
        assert_eq!(world.heights().at(6, 1), 0.0);
        assert_eq!(world.heights().at(1, 6), 0.0);
        assert_eq!(world.heights().at(6, 6), 0.7);
    }

    #[test]
    fn test_resolution_mismatch_fails_without_partial_writes() {
        let tiles = vec![tile(0, 0, 4, 0.5), tile(1, 0, 8, 0.5)];
        let mut world = WorldGrid::new(tiles, WorldGridConfig::default()).unwrap();
        let before = world.heights().clone();

        assert!(matches!(
            world.load_from_world(),
            Err(TerrainError::DimensionMismatch { expected: (4, 4), found: (8, 8) })
        ));
        assert_eq!(world.heights(), &before);

        world.heights_mut().fill(0.9);
        assert!(world.save_to_world().is_err());
        assert!(world.tiles().iter().all(|t| t.heights().values().iter().all(|&v| v == 0.5)));

        let dir = tempdir().unwrap();
        let path = dir.path().join("normal.png");
        assert!(world.export_normalmap_png(&path, &NormalMapOptions::default()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_configured_resolution_is_enforced() {
        let tiles = vec![tile(0, 0, 4, 0.5)];
        let mut world = WorldGrid::new(tiles, WorldGridConfig::with_tile_resolution(8)).unwrap();
        assert!(matches!(world.load_from_world(), Err(TerrainError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_save_stitches_seams_and_round_trips() {
        let mut world = sloped_world(3, 2, 6);
        world.save_to_world().unwrap();
        let saved = world.heights().clone();

        let tiles = world.tiles();
        // East border of tile (0,0) equals west border of tile (1,0).
        for z in 0..6 {
            assert_eq!(tiles[0].get_height(5, z), tiles[1].get_height(0, z));
        }
        // North border of tile (0,0) equals south border of tile (0,1).
        for x in 0..6 {
            assert_eq!(tiles[0].get_height(x, 5), tiles[3].get_height(x, 0));
        }
        // Corner shared by four tiles agrees everywhere.
        let corner = tiles[0].get_height(5, 5);
        assert_eq!(tiles[1].get_height(0, 5), corner);
        assert_eq!(tiles[3].get_height(5, 0), corner);
        assert_eq!(tiles[4].get_height(0, 0), corner);

        world.load_from_world().unwrap();
        assert_eq!(world.heights(), &saved);
    }

    #[test]
    fn test_set_height_world_units_scales_uniformly() {
        let mut world = sloped_world(2, 2, 8);
        world.save_to_world().unwrap();
        world.load_from_world().unwrap();
        let before = world.heights().clone();
        let (_, max) = before.min_max();
        let previous_max = max * world.config().max_terrain_height;

        world.set_height_world_units(150.0).unwrap();
        world.save_to_world().unwrap();
        world.load_from_world().unwrap();

        let factor = 150.0 / previous_max;
        for (a, b) in before.values().iter().zip(world.heights().values()) {
            assert!((a * factor - b).abs() < 1e-6);
        }
        let (_, new_max) = world.heights().min_max();
        assert!((new_max * world.config().max_terrain_height - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_set_height_world_units_noop_on_zero_max() {
        let tiles = vec![tile(0, 0, 4, 0.0)];
        let mut world = WorldGrid::load(tiles, WorldGridConfig::default()).unwrap();
        world.set_height_world_units(100.0).unwrap();
        assert!(world.heights().values().iter().all(|&v| v == 0.0));
        assert!(world.set_height_world_units(f32::NAN).is_err());
    }

    #[test]
    fn test_height_at_world() {
        let world = sloped_world(2, 1, 4);
        assert_eq!(world.height_at_world(0.0, 0.0), Some(world.heights().at(0, 0)));
        assert!(world.height_at_world(-10.0, 0.0).is_none());
        assert!(world.height_at_world(25.0, 12.5).is_some());

        // The last cell centre is the far edge of the sampled area.
        assert_eq!(world.height_at_world(87.5, 37.5), Some(world.heights().at(7, 3)));
        assert!(world.height_at_world(90.0, 0.0).is_none());
        assert!(world.height_at_world(0.0, 50.0).is_none());
    }

    #[test]
    fn test_splat_export_rejects_mismatched_height_resolution() {
        let a = tile(0, 0, 4, 0.0)
            .with_splat_layers(vec![ScalarGrid::filled(4, 4, 1.0)])
            .unwrap();
        let b = tile(1, 0, 8, 0.0)
            .with_splat_layers(vec![ScalarGrid::filled(4, 4, 1.0)])
            .unwrap();
        let world = WorldGrid::new(vec![a, b], WorldGridConfig::default()).unwrap();
        assert!(matches!(
            world.compose_splat_layers(SplatLayers::All),
            Err(TerrainError::DimensionMismatch { .. })
        ));

        let dir = tempdir().unwrap();
        let path = dir.path().join("splat.png");
        assert!(world
            .export_splatmap_png(&path, SplatLayers::Single(0), &PngOptions::default())
            .is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_splat_layers_average_seams() {
        let a = tile(0, 0, 4, 0.0)
            .with_splat_layers(vec![ScalarGrid::filled(4, 4, 1.0), ScalarGrid::filled(4, 4, 0.0)])
            .unwrap();
        let b = tile(1, 0, 4, 0.0)
            .with_splat_layers(vec![ScalarGrid::filled(4, 4, 0.0), ScalarGrid::filled(4, 4, 1.0)])
            .unwrap();
        let world = WorldGrid::load(vec![a, b], WorldGridConfig::default()).unwrap();

        let single = world.compose_splat_layers(SplatLayers::Single(0)).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].at(0, 0), 1.0);
        assert_eq!(single[0].at(3, 0), 0.5);
        assert_eq!(single[0].at(4, 0), 0.5);
        assert_eq!(single[0].at(7, 0), 0.0);

        let all = world.compose_splat_layers(SplatLayers::All).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].at(7, 3), 1.0);

        assert!(world.compose_splat_layers(SplatLayers::Single(2)).is_err());

        let dir = tempdir().unwrap();
        let path = dir.path().join("splat.png");
        world
            .export_splatmap_png(&path, SplatLayers::All, &PngOptions::default())
            .unwrap();
        assert_eq!(read_png(&path).unwrap().channels, 2);
    }

    #[test]
    fn test_export_waterflow_map_is_normalized() {
        let world = sloped_world(2, 2, 8);
        let sim = FlowSimulator::new(FlowSimulatorConfig {
            seed: 3,
            ..Default::default()
        })
        .unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.png");
        world
            .export_waterflow_map_png(&sim, 2, &path, &PngOptions::default())
            .unwrap();

        let flow = &read_png_grids(&path).unwrap()[0];
        let (min, max) = flow.min_max();
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
    }

    #[test]
    fn test_export_shoreline_and_heightmap() {
        let world = sloped_world(2, 1, 8);
        let masker = ShorelineMasker::new(crate::shoreline::ShorelineMaskerConfig {
            sea_level: 0.3,
            include_boundary_cells: true,
            ..Default::default()
        })
        .unwrap();
        let dir = tempdir().unwrap();
        let mask_path = world
            .export_shoreline_mask_png(&masker, &dir.path().join("shore.png"), &PngOptions::default())
            .unwrap();
        assert!(mask_path.exists());

        let raw = world
            .export_heightmap_raw(&dir.path().join("height.raw"), RawFormat::R16LittleEndian)
            .unwrap();
        assert_eq!(std::fs::metadata(raw).unwrap().len(), 16 * 8 * 2);
    }
}
