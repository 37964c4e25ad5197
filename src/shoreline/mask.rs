//! Shoreline proximity mask.
//!
//! Cells at sea level seed a linear falloff `1 - distance / mask_size` over
//! submerged cells within `mask_size` cells. Overlapping contributions combine
//! with `max`, so the order in which sources are processed never matters. Dry
//! cells take `above_water_strength` unconditionally.

use super::config::ShorelineMaskerConfig;
use crate::error::Result;
use crate::grid::ScalarGrid;

/// Classification of a cell relative to the water line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Submerged,
    Shoreline,
    Dry,
}

/// Builds shoreline masks from heightfields.
#[derive(Debug, Clone)]
pub struct ShorelineMasker {
    config: ShorelineMaskerConfig,
}

impl ShorelineMasker {
    pub fn new(config: ShorelineMaskerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ShorelineMaskerConfig {
        &self.config
    }

    pub fn classify(&self, height: f32) -> CellKind {
        let sea = self.config.sea_level;
        if (height - sea).abs() <= self.config.sea_level_epsilon {
            CellKind::Shoreline
        } else if height < sea {
            CellKind::Submerged
        } else {
            CellKind::Dry
        }
    }

    fn has_dry_neighbour(&self, heights: &ScalarGrid, x: u32, z: u32) -> bool {
        let (w, d) = heights.dimensions();
        [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)].iter().any(|&(dx, dz)| {
            let nx = x as i64 + dx;
            let nz = z as i64 + dz;
            nx >= 0
                && nz >= 0
                && nx < w as i64
                && nz < d as i64
                && self.classify(heights.at(nx as u32, nz as u32)) == CellKind::Dry
        })
    }

    /// Returns the shoreline source cells in scan order.
    pub fn shoreline_sources(&self, heights: &ScalarGrid) -> Vec<(u32, u32)> {
        heights
            .cell_coords()
            .filter(|&(x, z)| match self.classify(heights.at(x, z)) {
                CellKind::Shoreline => true,
                CellKind::Submerged => {
                    self.config.include_boundary_cells && self.has_dry_neighbour(heights, x, z)
                }
                CellKind::Dry => false,
            })
            .collect()
    }

    /// Applies the falloff from `sources`, in the given order, over a base mask
    /// with dry cells set to `above_water_strength`. No flip is applied.
    pub fn apply_sources(&self, heights: &ScalarGrid, sources: &[(u32, u32)]) -> ScalarGrid {
        let (w, d) = heights.dimensions();
        let mut mask = ScalarGrid::new(w, d);
        for (x, z) in heights.cell_coords() {
            if self.classify(heights.at(x, z)) == CellKind::Dry {
                mask.set_at(x, z, self.config.above_water_strength);
            }
        }

        let radius = self.config.mask_size;
        for &(sx, sz) in sources {
            if !heights.contains(sx, sz) {
                continue;
            }
            let x0 = sx.saturating_sub(radius);
            let z0 = sz.saturating_sub(radius);
            let x1 = sx.saturating_add(radius).min(w - 1);
            let z1 = sz.saturating_add(radius).min(d - 1);

            for z in z0..=z1 {
                for x in x0..=x1 {
                    if self.classify(heights.at(x, z)) == CellKind::Dry {
                        continue;
                    }
                    let dx = x as f32 - sx as f32;
                    let dz = z as f32 - sz as f32;
                    let distance = (dx * dx + dz * dz).sqrt();
                    let strength = if radius == 0 {
                        if distance == 0.0 { 1.0 } else { continue }
                    } else if distance <= radius as f32 {
                        (1.0 - distance / radius as f32).clamp(0.0, 1.0)
                    } else {
                        continue;
                    };
                    let current = mask.at(x, z);
                    mask.set_at(x, z, current.max(strength));
                }
            }
        }
        mask
    }

    /// Builds the mask for `heights`, flipped if configured.
    pub fn build_mask(&self, heights: &ScalarGrid) -> ScalarGrid {
        let sources = self.shoreline_sources(heights);
        let mut mask = self.apply_sources(heights, &sources);
        if self.config.flip_output {
            mask.flip();
        }
        tracing::debug!(
            width = heights.width(),
            depth = heights.depth(),
            sources = sources.len(),
            "shoreline mask built"
        );
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn single_source_grid() -> ScalarGrid {
        let mut heights = ScalarGrid::filled(10, 10, 0.0);
        heights.set_at(5, 5, 0.5);
        heights
    }

    /// Masker that seeds only from cells at sea level.
    fn masker(mask_size: u32) -> ShorelineMasker {
        ShorelineMasker::new(ShorelineMaskerConfig {
            sea_level: 0.5,
            mask_size,
            above_water_strength: 1.0,
            include_boundary_cells: false,
            ..Default::default()
        })
        .unwrap()
    }

    fn radial_island(size: u32) -> ScalarGrid {
        let mut heights = ScalarGrid::new(size, size);
        let c = (size - 1) as f32 / 2.0;
        for (x, z) in heights.cell_coords().collect::<Vec<_>>() {
            let dx = x as f32 - c;
            let dz = z as f32 - c;
            let d = (dx * dx + dz * dz).sqrt() / (c * std::f32::consts::SQRT_2);
            heights.set_at(x, z, (1.0 - d).clamp(0.0, 1.0) * 0.8);
        }
        heights
    }

    #[test]
    fn test_linear_falloff_from_single_source() {
        let mask = masker(3).build_mask(&single_source_grid());
        assert!((mask.at(5, 5) - 1.0).abs() < 1e-6);
        assert!((mask.at(5, 6) - (1.0 - 1.0 / 3.0)).abs() < 1e-6);
        assert!((mask.at(5, 7) - (1.0 - 2.0 / 3.0)).abs() < 1e-6);
        assert!(mask.at(5, 8).abs() < 1e-6);
        assert_eq!(mask.at(0, 0), 0.0);
        // Diagonal distance sqrt(2).
        assert!((mask.at(6, 6) - (1.0 - 2f32.sqrt() / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_dry_cells_take_above_water_strength() {
        let mut heights = ScalarGrid::filled(6, 6, 0.9);
        heights.set_at(0, 0, 0.1);
        heights.set_at(1, 0, 0.5);
        let masker = ShorelineMasker::new(ShorelineMaskerConfig {
            sea_level: 0.5,
            mask_size: 4,
            above_water_strength: 0.3,
            include_boundary_cells: false,
            ..Default::default()
        })
        .unwrap();
        let mask = masker.build_mask(&heights);
        assert_eq!(mask.at(3, 3), 0.3);
        assert_eq!(mask.at(2, 0), 0.3);
        assert!((mask.at(0, 0) - 0.75).abs() < 1e-6);
        assert_eq!(mask.at(1, 0), 1.0);
    }

    #[test]
    fn test_source_order_does_not_matter() {
        let mut heights = ScalarGrid::new(24, 24);
        for (x, z) in heights.cell_coords().collect::<Vec<_>>() {
            let h = if (x + 2 * z) % 7 == 0 { 0.5 } else { 0.2 + ((x * z) % 5) as f32 * 0.1 };
            heights.set_at(x, z, h);
        }
        let masker = masker(4);
        let mut sources = masker.shoreline_sources(&heights);
        assert!(sources.len() > 10);

        let reference = masker.apply_sources(&heights, &sources);
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..5 {
            sources.shuffle(&mut rng);
            assert_eq!(masker.apply_sources(&heights, &sources), reference);
        }
        sources.reverse();
        assert_eq!(masker.apply_sources(&heights, &sources), reference);
    }

    #[test]
    fn test_boundary_cells_become_sources() {
        let mut heights = ScalarGrid::filled(5, 1, 0.2);
        heights.set_at(3, 0, 0.8);
        heights.set_at(4, 0, 0.8);
        let plain = masker(2);
        assert!(plain.shoreline_sources(&heights).is_empty());

        let boundary = ShorelineMasker::new(ShorelineMaskerConfig {
            sea_level: 0.5,
            mask_size: 2,
            include_boundary_cells: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(boundary.shoreline_sources(&heights), vec![(2, 0)]);
        let mask = boundary.build_mask(&heights);
        assert_eq!(mask.at(2, 0), 1.0);
        assert!((mask.at(1, 0) - 0.5).abs() < 1e-6);
        assert_eq!(mask.at(0, 0), 0.0);
    }

    #[test]
    fn test_default_config_rings_a_continuous_island() {
        let heights = radial_island(64);
        let masker = ShorelineMasker::new(ShorelineMaskerConfig {
            sea_level: 0.2,
            mask_size: 6,
            ..Default::default()
        })
        .unwrap();

        let sources = masker.shoreline_sources(&heights);
        assert!(!sources.is_empty());
        assert!(sources
            .iter()
            .all(|&(x, z)| masker.classify(heights.at(x, z)) != CellKind::Dry));

        let mask = masker.build_mask(&heights);
        let falloff = mask.values().iter().filter(|&&v| v > 0.0 && v < 1.0).count();
        assert!(falloff > 0);
        for &(x, z) in &sources {
            assert_eq!(mask.at(x, z), 1.0);
        }
        assert_eq!(mask.at(0, 0), 0.0);
    }

    #[test]
    fn test_default_keeps_single_cell_falloff() {
        let masker = ShorelineMasker::new(ShorelineMaskerConfig {
            sea_level: 0.5,
            mask_size: 3,
            ..Default::default()
        })
        .unwrap();
        let mask = masker.build_mask(&single_source_grid());
        assert!((mask.at(5, 5) - 1.0).abs() < 1e-6);
        assert!((mask.at(5, 6) - (1.0 - 1.0 / 3.0)).abs() < 1e-6);
        assert!(mask.at(5, 8).abs() < 1e-6);
    }

    #[test]
    fn test_zero_radius_marks_sources_only() {
        let mask = masker(0).build_mask(&single_source_grid());
        assert_eq!(mask.at(5, 5), 1.0);
        assert_eq!(mask.at(5, 6), 0.0);
    }

    #[test]
    fn test_flip_output() {
        let masker = ShorelineMasker::new(ShorelineMaskerConfig {
            sea_level: 0.5,
            mask_size: 1,
            flip_output: true,
            ..Default::default()
        })
        .unwrap();
        let mut heights = ScalarGrid::filled(4, 4, 0.0);
        heights.set_at(1, 0, 0.5);
        let mask = masker.build_mask(&heights);
        assert_eq!(mask.at(1, 3), 1.0);
        assert_eq!(mask.at(1, 0), 0.0);
    }
}
