//! Normal map generation from heightfields (central differences).

use std::path::{Path, PathBuf};

use glam::Vec3;

use super::codec::BitDepth;
use super::png::{write_channels_png, PngOptions};
use crate::error::{Result, TerrainError};
use crate::grid::ScalarGrid;

/// Options for normal map generation.
#[derive(Debug, Clone, Copy)]
pub struct NormalMapOptions {
    /// Scales the effect of height gradients. Higher = stronger normals.
    pub strength: f32,
    pub png: PngOptions,
}

impl Default for NormalMapOptions {
    fn default() -> Self {
        Self {
            strength: 1.0,
            png: PngOptions::with_bit_depth(BitDepth::Eight),
        }
    }
}

/// Height difference along one axis: central in the interior, one-sided at the borders.
fn difference(prev: Option<f32>, here: f32, next: Option<f32>) -> f32 {
    match (prev, next) {
        (Some(p), Some(n)) => (n - p) * 0.5,
        (None, Some(n)) => n - here,
        (Some(p), None) => here - p,
        (None, None) => 0.0,
    }
}

/// Returns the `(dx, dz)` gradient of `heights` at a cell.
pub fn gradient_at(heights: &ScalarGrid, x: u32, z: u32) -> (f32, f32) {
    let (w, d) = heights.dimensions();
    let here = heights.at(x, z);
    let dx = difference(
        (x > 0).then(|| heights.at(x - 1, z)),
        here,
        (x + 1 < w).then(|| heights.at(x + 1, z)),
    );
    let dz = difference(
        (z > 0).then(|| heights.at(x, z - 1)),
        here,
        (z + 1 < d).then(|| heights.at(x, z + 1)),
    );
    (dx, dz)
}

/// Unit surface normal `(-dx, -dz, 1)` scaled by `strength` before normalizing.
pub fn normal_at(heights: &ScalarGrid, x: u32, z: u32, strength: f32) -> Vec3 {
    let (dx, dz) = gradient_at(heights, x, z);
    Vec3::new(-dx * strength, -dz * strength, 1.0).normalize_or_zero()
}

/// Derives three grids holding the normal's x, y, z components remapped from `[-1, 1]` to `[0, 1]`.
pub fn normal_map_channels(heights: &ScalarGrid, strength: f32) -> [ScalarGrid; 3] {
    let (w, d) = heights.dimensions();
    let mut channels = [ScalarGrid::new(w, d), ScalarGrid::new(w, d), ScalarGrid::new(w, d)];
    for (x, z) in heights.cell_coords() {
        let c = normal_at(heights, x, z, strength) * 0.5 + Vec3::splat(0.5);
        channels[0].set_at(x, z, c.x);
        channels[1].set_at(x, z, c.y);
        channels[2].set_at(x, z, c.z);
    }
    channels
}

/// Exports the normal map of `heights` as an RGB PNG.
///
/// Output is tangent-space-like with Z pointing “out of the image”.
pub fn export_normal_map_png(
    heights: &ScalarGrid,
    path: &Path,
    options: &NormalMapOptions,
) -> Result<PathBuf> {
    if !options.strength.is_finite() || options.strength <= 0.0 {
        return Err(TerrainError::InvalidConfig(format!(
            "normal strength {} must be > 0",
            options.strength
        )));
    }
    let [nx, ny, nz] = normal_map_channels(heights, options.strength);
    write_channels_png(&[&nx, &ny, &nz], path, &options.png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::read_png;
    use tempfile::tempdir;

    #[test]
    fn test_flat_normals_point_up() {
        let heights = ScalarGrid::filled(6, 6, 0.3);
        let [nx, ny, nz] = normal_map_channels(&heights, 1.0);
        for (x, z) in heights.cell_coords() {
            assert!((nx.at(x, z) - 0.5).abs() < 1e-6);
            assert!((ny.at(x, z) - 0.5).abs() < 1e-6);
            assert!((nz.at(x, z) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_gradient_one_sided_at_borders() {
        // Height rises by 0.1 per column.
        let mut heights = ScalarGrid::new(4, 3);
        for (x, z) in heights.cell_coords().collect::<Vec<_>>() {
            heights.set_at(x, z, x as f32 * 0.1);
        }
        for x in 0..4 {
            let (dx, dz) = gradient_at(&heights, x, 1);
            assert!((dx - 0.1).abs() < 1e-6, "x={} dx={}", x, dx);
            assert_eq!(dz, 0.0);
        }
    }

    #[test]
    fn test_slope_tilts_normal_against_gradient() {
        let mut heights = ScalarGrid::new(5, 5);
        for (x, z) in heights.cell_coords().collect::<Vec<_>>() {
            heights.set_at(x, z, x as f32 * 0.25);
        }
        let n = normal_at(&heights, 2, 2, 1.0);
        assert!(n.x < 0.0);
        assert!(n.y.abs() < 1e-6);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_export_normal_map_png() {
        let mut heights = ScalarGrid::new(16, 16);
        for (x, z) in heights.cell_coords().collect::<Vec<_>>() {
            heights.set_at(x, z, (x as f32 * 0.3).sin() * 0.5 + 0.5);
        }
        let dir = tempdir().unwrap();
        let path = dir.path().join("normal.png");
        export_normal_map_png(&heights, &path, &NormalMapOptions::default()).unwrap();

        let image = read_png(&path).unwrap();
        assert_eq!(image.channels, 3);
        assert_eq!((image.width, image.height), (16, 16));
    }

    #[test]
    fn test_invalid_strength() {
        let heights = ScalarGrid::new(4, 4);
        let dir = tempdir().unwrap();
        let options = NormalMapOptions {
            strength: 0.0,
            ..Default::default()
        };
        assert!(export_normal_map_png(&heights, &dir.path().join("n.png"), &options).is_err());
    }
}
