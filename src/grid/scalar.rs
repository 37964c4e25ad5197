//! Owned row-major scalar grid used for heights, flow and masks.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// A `width x depth` buffer of `f32` values in row-major order (`z` selects the row).
///
/// Heights are normalized to `[0, 1]`; other uses (flow intensity before
/// normalization, sediment) may hold any finite value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarGrid {
    width: u32,
    depth: u32,
    values: Vec<f32>,
}

impl ScalarGrid {
    /// Creates a zero-filled grid.
    pub fn new(width: u32, depth: u32) -> Self {
        Self::filled(width, depth, 0.0)
    }

    /// Creates a grid with every cell set to `value`.
    pub fn filled(width: u32, depth: u32, value: f32) -> Self {
        let size = (width as usize) * (depth as usize);
        Self {
            width,
            depth,
            values: vec![value; size],
        }
    }

    /// Wraps an existing row-major buffer, checking that its length matches.
    pub fn from_values(width: u32, depth: u32, values: Vec<f32>) -> Result<Self> {
        let expected = (width as usize) * (depth as usize);
        if values.len() != expected {
            return Err(TerrainError::DimensionMismatch {
                expected: (width, depth),
                found: (values.len() as u32, 1),
            });
        }
        Ok(Self {
            width,
            depth,
            values,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns `(width, depth)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.depth)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn contains(&self, x: u32, z: u32) -> bool {
        x < self.width && z < self.depth
    }

    #[inline]
    pub fn index_of(&self, x: u32, z: u32) -> usize {
        (z as usize) * (self.width as usize) + (x as usize)
    }

    fn check_bounds(&self, x: u32, z: u32) -> Result<()> {
        if self.contains(x, z) {
            Ok(())
        } else {
            Err(TerrainError::OutOfBounds {
                x,
                z,
                width: self.width,
                depth: self.depth,
            })
        }
    }

    /// Returns the value at `(x, z)`, failing with `OutOfBounds` outside the grid.
    pub fn get(&self, x: u32, z: u32) -> Result<f32> {
        self.check_bounds(x, z)?;
        Ok(self.values[self.index_of(x, z)])
    }

    /// Sets the value at `(x, z)`, failing with `OutOfBounds` outside the grid.
    pub fn set(&mut self, x: u32, z: u32, value: f32) -> Result<()> {
        self.check_bounds(x, z)?;
        let i = self.index_of(x, z);
        self.values[i] = value;
        Ok(())
    }

    /// Fast accessor for in-crate loops whose coordinates are already bounded.
    ///
    /// # Panics
    /// Panics if `(x, z)` is out of bounds.
    #[inline]
    pub fn at(&self, x: u32, z: u32) -> f32 {
        debug_assert!(self.contains(x, z));
        self.values[self.index_of(x, z)]
    }

    /// Fast setter counterpart of [`ScalarGrid::at`].
    ///
    /// # Panics
    /// Panics if `(x, z)` is out of bounds.
    #[inline]
    pub fn set_at(&mut self, x: u32, z: u32, value: f32) {
        debug_assert!(self.contains(x, z));
        let i = self.index_of(x, z);
        self.values[i] = value;
    }

    pub fn fill(&mut self, value: f32) {
        self.values.fill(value);
    }

    /// Returns `(min, max)` over all cells, or `(0, 0)` for an empty grid.
    pub fn min_max(&self) -> (f32, f32) {
        if self.values.is_empty() {
            return (0.0, 0.0);
        }
        self.values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Iterates all `(x, z)` coordinates in storage order.
    pub fn cell_coords(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let (w, d) = (self.width, self.depth);
        (0..d).flat_map(move |z| (0..w).map(move |x| (x, z)))
    }

    /// Bilinearly interpolates at fractional cell coordinates.
    ///
    /// Coordinates are clamped to `[0, width-1] x [0, depth-1]`; there is no wraparound.
    pub fn sample_bilinear(&self, fx: f32, fz: f32) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let max_x = (self.width - 1) as f32;
        let max_z = (self.depth - 1) as f32;
        let fx = if fx.is_nan() { 0.0 } else { fx.clamp(0.0, max_x) };
        let fz = if fz.is_nan() { 0.0 } else { fz.clamp(0.0, max_z) };

        let x0 = fx.floor() as u32;
        let z0 = fz.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let z1 = (z0 + 1).min(self.depth - 1);
        let tx = fx - x0 as f32;
        let tz = fz - z0 as f32;

        let h00 = self.at(x0, z0);
        let h10 = self.at(x1, z0);
        let h01 = self.at(x0, z1);
        let h11 = self.at(x1, z1);

        let h0 = h00 * (1.0 - tx) + h10 * tx;
        let h1 = h01 * (1.0 - tx) + h11 * tx;
        h0 * (1.0 - tz) + h1 * tz
    }

    /// Reverses the row order in place.
    pub fn flip(&mut self) {
        let w = self.width as usize;
        let d = self.depth as usize;
        for z in 0..d / 2 {
            let (top, bottom) = self.values.split_at_mut((d - 1 - z) * w);
            top[z * w..(z + 1) * w].swap_with_slice(&mut bottom[..w]);
        }
    }

    /// Applies a 3x3 box blur `iterations` times.
    ///
    /// Each pass reads from a snapshot of the previous pass. Edge cells average
    /// only the neighbours that exist.
    pub fn smooth(&mut self, iterations: u32) {
        if iterations == 0 || self.values.is_empty() {
            return;
        }
        let w = self.width as i64;
        let d = self.depth as i64;
        let mut snapshot = self.values.clone();

        for _ in 0..iterations {
            snapshot.copy_from_slice(&self.values);
            for z in 0..d {
                for x in 0..w {
                    let mut sum = 0.0f32;
                    let mut count = 0u32;
                    for dz in -1..=1 {
                        for dx in -1..=1 {
                            let nx = x + dx;
                            let nz = z + dz;
                            if nx < 0 || nz < 0 || nx >= w || nz >= d {
                                continue;
                            }
                            sum += snapshot[(nz * w + nx) as usize];
                            count += 1;
                        }
                    }
                    self.values[(z * w + x) as usize] = sum / count as f32;
                }
            }
        }
    }

    /// Linearly rescales values so the minimum maps to 0 and the maximum to 1.
    ///
    /// A uniform grid has no range to stretch; every value is set to 0.
    pub fn normalize(&mut self) {
        let (min, max) = self.min_max();
        let range = max - min;
        if !(range > 0.0) || !range.is_finite() {
            self.values.fill(0.0);
            return;
        }
        for v in &mut self.values {
            *v = (*v - min) / range;
        }
    }

    /// Multiplies every value by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    /// Adds `other` elementwise into `self`.
    pub fn accumulate(&mut self, other: &ScalarGrid) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(TerrainError::DimensionMismatch {
                expected: self.dimensions(),
                found: other.dimensions(),
            });
        }
        for (a, &b) in self.values.iter_mut().zip(other.values.iter()) {
            *a += b;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, depth: u32) -> ScalarGrid {
        let values = (0..width * depth).map(|i| i as f32).collect();
        ScalarGrid::from_values(width, depth, values).unwrap()
    }

    #[test]
    fn test_new_grid_is_zeroed() {
        let grid = ScalarGrid::new(8, 4);
        assert_eq!(grid.len(), 32);
        assert!(grid.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_get_set_and_bounds() {
        let mut grid = ScalarGrid::new(4, 3);
        grid.set(3, 2, 0.5).unwrap();
        assert_eq!(grid.get(3, 2).unwrap(), 0.5);
        assert!(matches!(
            grid.get(4, 0),
            Err(TerrainError::OutOfBounds { x: 4, z: 0, .. })
        ));
        assert!(grid.set(0, 3, 1.0).is_err());
    }

    #[test]
    fn test_from_values_rejects_wrong_length() {
        assert!(ScalarGrid::from_values(3, 3, vec![0.0; 8]).is_err());
    }

    #[test]
    fn test_flip_reverses_rows_and_is_involution() {
        let original = ramp(3, 5);
        let mut grid = original.clone();
        grid.flip();
        assert_eq!(grid.at(0, 0), original.at(0, 4));
        assert_eq!(grid.at(2, 1), original.at(2, 3));
        assert_eq!(grid.at(1, 2), original.at(1, 2));
        grid.flip();
        assert_eq!(grid, original);
    }

    #[test]
    fn test_normalize_uniform_is_zero() {
        let mut grid = ScalarGrid::filled(6, 6, 0.7);
        grid.normalize();
        assert!(grid.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalize_range() {
        let mut grid = ramp(4, 4);
        grid.normalize();
        let (min, max) = grid.min_max();
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
    }

    #[test]
    fn test_smooth_preserves_uniform_and_spreads_spike() {
        let mut uniform = ScalarGrid::filled(5, 5, 0.25);
        uniform.smooth(3);
        assert!(uniform.values().iter().all(|&v| (v - 0.25).abs() < 1e-6));

        let mut spike = ScalarGrid::new(5, 5);
        spike.set_at(2, 2, 9.0);
        spike.smooth(1);
        assert!((spike.at(2, 2) - 1.0).abs() < 1e-6);
        assert!((spike.at(1, 1) - 1.0).abs() < 1e-6);
        assert_eq!(spike.at(0, 0), 0.0);
    }

    #[test]
    fn test_sample_bilinear_interpolates_and_clamps() {
        let grid = ScalarGrid::from_values(2, 2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert!((grid.sample_bilinear(0.5, 0.5) - 1.5).abs() < 1e-6);
        assert!((grid.sample_bilinear(1.0, 0.0) - 1.0).abs() < 1e-6);
        assert_eq!(grid.sample_bilinear(-4.0, -4.0), 0.0);
        assert_eq!(grid.sample_bilinear(10.0, 10.0), 3.0);
    }

    #[test]
    fn test_cell_coords_order() {
        let grid = ScalarGrid::new(3, 2);
        let coords: Vec<_> = grid.cell_coords().collect();
        assert_eq!(coords.len(), 6);
        assert_eq!(coords[1], (1, 0));
        assert_eq!(coords[3], (0, 1));
    }

    #[test]
    fn test_accumulate_checks_dimensions() {
        let mut a = ScalarGrid::filled(2, 2, 1.0);
        let b = ScalarGrid::filled(2, 2, 0.5);
        a.accumulate(&b).unwrap();
        assert!(a.values().iter().all(|&v| v == 1.5));
        assert!(a.accumulate(&ScalarGrid::new(3, 2)).is_err());
    }
}
