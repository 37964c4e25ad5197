//! Terratile CLI - batch processing of tiled terrain heightmaps.
//!
//! Each command loads a grayscale heightmap PNG, cuts it into a grid of tiles,
//! stitches them back into a world heightfield and writes a derived product.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

use terratile::erosion::FlowSimulator;
use terratile::export::{read_png_grids, write_grid_png, BitDepth, NormalMapOptions, PngOptions, RawFormat};
use terratile::shoreline::ShorelineMasker;
use terratile::task::{ProgressFn, Silent};
use terratile::world::{MemoryTile, WorldGrid};
use terratile::{Progress, Result, TerrainError, ToolConfig};

/// Tiled terrain heightfield processor.
#[derive(Parser)]
#[command(name = "terratile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with `world`, `flow` and `shoreline` settings.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Heightmap PNG (8 or 16-bit grayscale).
    input: PathBuf,

    /// Output file.
    #[arg(short, long)]
    output: PathBuf,

    /// Number of tiles along world X.
    #[arg(long, default_value = "1")]
    tiles_x: u32,

    /// Number of tiles along world Z.
    #[arg(long, default_value = "1")]
    tiles_z: u32,

    /// World units covered by one tile edge.
    #[arg(long, default_value = "1000.0")]
    tile_size: f32,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a normalized droplet water-flow map.
    Flow {
        #[command(flatten)]
        io: InputArgs,

        /// Random seed for droplet spawning.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of droplets (default: one per cell).
        #[arg(long)]
        droplets: Option<u32>,

        /// Box-blur passes applied before normalization.
        #[arg(long)]
        smooth: Option<u32>,

        /// Split the simulation across this many parallel partitions.
        #[arg(long)]
        partitions: Option<usize>,
    },

    /// Export a shoreline proximity mask.
    Shoreline {
        #[command(flatten)]
        io: InputArgs,

        /// Normalized water line height.
        #[arg(long)]
        sea_level: Option<f32>,

        /// Falloff radius in cells.
        #[arg(long)]
        mask_size: Option<u32>,

        /// Seed the falloff only from cells at sea level, not from the
        /// submerged cells bordering dry land.
        #[arg(long)]
        no_boundary_cells: bool,

        /// Flip rows of the output mask.
        #[arg(long)]
        flip: bool,
    },

    /// Export an RGB normal map.
    Normal {
        #[command(flatten)]
        io: InputArgs,

        /// Gradient scale before normalization.
        #[arg(long, default_value = "1.0")]
        strength: f32,

        /// Write 16-bit channels instead of 8-bit.
        #[arg(long)]
        sixteen_bit: bool,
    },

    /// Rescale heights so the tallest point reaches a world-unit height.
    Rescale {
        #[command(flatten)]
        io: InputArgs,

        /// Target height of the tallest point, in world units.
        #[arg(long)]
        target_height: f32,

        /// World units represented by a normalized height of 1.0.
        #[arg(long)]
        max_terrain_height: Option<f32>,
    },

    /// Re-export the stitched heightfield.
    Heightmap {
        #[command(flatten)]
        io: InputArgs,

        /// Export format.
        #[arg(short, long, default_value = "png")]
        format: ExportFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// 16-bit grayscale PNG.
    Png,
    /// 16-bit little-endian RAW.
    Raw,
    /// 32-bit float RAW.
    RawFloat,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "terratile failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ToolConfig::from_file(path)?,
        None => ToolConfig::default(),
    };
    let start = Instant::now();

    let written = match cli.command {
        Commands::Flow {
            io,
            seed,
            droplets,
            smooth,
            partitions,
        } => {
            if let Some(seed) = seed {
                config.flow.seed = seed;
            }
            if droplets.is_some() {
                config.flow.droplet_count = droplets;
            }
            let smooth = smooth.unwrap_or(config.flow.smooth_iterations);
            let world = load_world(&io, &config)?;
            let simulator = FlowSimulator::new(config.flow.clone())?;
            let options = PngOptions::default();

            match partitions {
                Some(partitions) if partitions > 1 => {
                    let monitor = ProgressFn(|p: Progress| {
                        tracing::debug!(completed = p.completed, total = p.total, "flow progress");
                    });
                    let mut flow = simulator
                        .simulate_parallel(world.heights(), partitions, &monitor)?
                        .flow;
                    flow.smooth(smooth);
                    flow.normalize();
                    write_grid_png(&flow, &io.output, &options)?
                }
                _ => world.export_waterflow_map_png(&simulator, smooth, &io.output, &options)?,
            }
        }
        Commands::Shoreline {
            io,
            sea_level,
            mask_size,
            no_boundary_cells,
            flip,
        } => {
            if let Some(sea_level) = sea_level {
                config.shoreline.sea_level = sea_level;
            }
            if let Some(mask_size) = mask_size {
                config.shoreline.mask_size = mask_size;
            }
            if no_boundary_cells {
                config.shoreline.include_boundary_cells = false;
            }
            config.shoreline.flip_output |= flip;
            let world = load_world(&io, &config)?;
            let masker = ShorelineMasker::new(config.shoreline.clone())?;
            world.export_shoreline_mask_png(&masker, &io.output, &PngOptions::default())?
        }
        Commands::Normal {
            io,
            strength,
            sixteen_bit,
        } => {
            let world = load_world(&io, &config)?;
            let mut options = NormalMapOptions {
                strength,
                ..Default::default()
            };
            if sixteen_bit {
                options.png = PngOptions::with_bit_depth(BitDepth::Sixteen);
            }
            world.export_normalmap_png(&io.output, &options)?
        }
        Commands::Rescale {
            io,
            target_height,
            max_terrain_height,
        } => {
            if let Some(max_terrain_height) = max_terrain_height {
                config.world.max_terrain_height = max_terrain_height;
            }
            let mut world = load_world(&io, &config)?;
            world.set_height_world_units(target_height)?;
            world.save_to_world()?;
            world.export_heightmap_png(&io.output, &PngOptions::default())?
        }
        Commands::Heightmap { io, format } => {
            let mut world = load_world(&io, &config)?;
            world.save_to_world()?;
            world.load_from_world_with(&Silent)?;
            match format {
                ExportFormat::Png => world.export_heightmap_png(&io.output, &PngOptions::default())?,
                ExportFormat::Raw => world.export_heightmap_raw(&io.output, RawFormat::R16LittleEndian)?,
                ExportFormat::RawFloat => world.export_heightmap_raw(&io.output, RawFormat::R32Float)?,
            }
        }
    };

    println!("Wrote {} in {:.2?}", written.display(), start.elapsed());
    Ok(())
}

/// Reads the input heightmap and stitches it into a world grid of `tiles_x * tiles_z` tiles.
fn load_world(io: &InputArgs, config: &ToolConfig) -> Result<WorldGrid<MemoryTile>> {
    let heights = read_heightmap(&io.input)?;
    let tiles = MemoryTile::split_grid(&heights, io.tiles_x, io.tiles_z, io.tile_size)?;
    let world = WorldGrid::load(tiles, config.world.clone())?;
    let (min, max) = world.heights().min_max();
    tracing::info!(
        input = %io.input.display(),
        columns = world.columns(),
        rows = world.rows(),
        min,
        max,
        "loaded heightmap"
    );
    Ok(world)
}

fn read_heightmap(path: &Path) -> Result<terratile::ScalarGrid> {
    let channels = read_png_grids(path)?;
    if channels.len() > 1 {
        tracing::warn!(channels = channels.len(), "using the first channel as heights");
    }
    channels
        .into_iter()
        .next()
        .ok_or_else(|| TerrainError::InvalidConfig(format!("{} has no channels", path.display())))
}
