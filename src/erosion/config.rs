//! Flow simulator configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Where droplets start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpawnOrder {
    /// Droplet `i` starts at cell `(i % width, (i / width) % depth)`.
    Scan,
    /// Uniformly random positions drawn from the injected RNG.
    #[default]
    Random,
}

/// Sediment transport parameters used by [`FlowSimulator::erode`](super::FlowSimulator::erode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SedimentConfig {
    /// Carrying capacity per unit of speed, descent and water volume.
    pub capacity: f32,
    /// Fraction of spare capacity picked up per step.
    pub erosion_rate: f32,
    /// Fraction of excess sediment dropped per step.
    pub deposition_rate: f32,
}

impl Default for SedimentConfig {
    fn default() -> Self {
        Self {
            capacity: 4.0,
            erosion_rate: 0.3,
            deposition_rate: 0.3,
        }
    }
}

impl SedimentConfig {
    /// Sediment a droplet can hold: `capacity * speed * slope * volume`.
    ///
    /// `slope` is the height lost over the step; uphill steps carry nothing.
    pub fn carrying_capacity(&self, speed: f32, slope: f32, volume: f32) -> f32 {
        self.capacity * speed.max(0.0) * slope.max(0.0) * volume.max(0.0)
    }
}

/// Parameters for droplet flow accumulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSimulatorConfig {
    /// Initial water volume per droplet (> 0).
    pub droplet_volume: f32,
    /// Fraction of volume lost per step, in (0, 1].
    pub absorption_rate: f32,
    /// Number of droplets; `None` spawns one per grid cell.
    pub droplet_count: Option<u32>,
    /// Steps after which a droplet is retired.
    pub max_steps: u32,
    /// Droplets with less water than this are retired.
    pub min_volume_epsilon: f32,
    /// Distance moved per step, in cells.
    pub step_length: f32,
    /// Blend of previous direction into the new one, in [0, 1). 0 is pure steepest descent.
    pub inertia: f32,
    /// Gradient magnitudes at or below this count as flat.
    pub flat_gradient_epsilon: f32,
    pub spawn_order: SpawnOrder,
    /// Seed for the droplet RNG.
    pub seed: u64,
    /// Box-blur passes applied to the flow map before export.
    pub smooth_iterations: u32,
    pub sediment: SedimentConfig,
}

impl Default for FlowSimulatorConfig {
    fn default() -> Self {
        Self {
            droplet_volume: 1.0,
            absorption_rate: 0.05,
            droplet_count: None,
            max_steps: 64,
            min_volume_epsilon: 1e-3,
            step_length: 1.0,
            inertia: 0.0,
            flat_gradient_epsilon: 1e-6,
            spawn_order: SpawnOrder::default(),
            seed: 0,
            smooth_iterations: 2,
            sediment: SedimentConfig::default(),
        }
    }
}

impl FlowSimulatorConfig {
    /// Number of droplets to simulate for a `width x depth` grid.
    pub fn droplets_for(&self, width: u32, depth: u32) -> usize {
        match self.droplet_count {
            Some(n) => n as usize,
            None => (width as usize) * (depth as usize),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(TerrainError::InvalidConfig(msg));
        if !(self.droplet_volume > 0.0) || !self.droplet_volume.is_finite() {
            return fail(format!("droplet_volume {} must be > 0", self.droplet_volume));
        }
        if !(self.absorption_rate > 0.0 && self.absorption_rate <= 1.0) {
            return fail(format!("absorption_rate {} must be in (0, 1]", self.absorption_rate));
        }
        if !(self.min_volume_epsilon >= 0.0) {
            return fail(format!("min_volume_epsilon {} must be >= 0", self.min_volume_epsilon));
        }
        if !(self.step_length > 0.0) || !self.step_length.is_finite() {
            return fail(format!("step_length {} must be > 0", self.step_length));
        }
        if !(self.inertia >= 0.0 && self.inertia < 1.0) {
            return fail(format!("inertia {} must be in [0, 1)", self.inertia));
        }
        if !(self.flat_gradient_epsilon >= 0.0) {
            return fail(format!(
                "flat_gradient_epsilon {} must be >= 0",
                self.flat_gradient_epsilon
            ));
        }
        let s = &self.sediment;
        if !(s.capacity >= 0.0 && s.erosion_rate >= 0.0 && s.deposition_rate >= 0.0) {
            return fail("sediment parameters must be >= 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FlowSimulatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_absorption() {
        let mut cfg = FlowSimulatorConfig::default();
        cfg.absorption_rate = 0.0;
        assert!(cfg.validate().is_err());
        cfg.absorption_rate = 1.5;
        assert!(cfg.validate().is_err());
        cfg.absorption_rate = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_carrying_capacity_scales_with_speed() {
        let sediment = SedimentConfig::default();
        let slow = sediment.carrying_capacity(0.5, 0.1, 1.0);
        let fast = sediment.carrying_capacity(1.0, 0.1, 1.0);
        assert!((fast - 2.0 * slow).abs() < 1e-6);
        assert!((fast - 4.0 * 0.1).abs() < 1e-6);
        assert_eq!(sediment.carrying_capacity(0.0, 0.1, 1.0), 0.0);
        assert_eq!(sediment.carrying_capacity(1.0, -0.1, 1.0), 0.0);
    }

    #[test]
    fn test_droplets_for() {
        let mut cfg = FlowSimulatorConfig::default();
        assert_eq!(cfg.droplets_for(8, 4), 32);
        cfg.droplet_count = Some(5);
        assert_eq!(cfg.droplets_for(8, 4), 5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: FlowSimulatorConfig =
            serde_json::from_str(r#"{ "absorption_rate": 0.2, "seed": 7 }"#).unwrap();
        assert_eq!(cfg.absorption_rate, 0.2);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.max_steps, 64);
    }
}
