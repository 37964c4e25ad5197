//! A single water droplet walking downhill over a heightfield.

use glam::Vec2;

use super::config::FlowSimulatorConfig;
use crate::grid::ScalarGrid;

/// Why a droplet stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropletFate {
    /// Volume fell below `min_volume_epsilon`.
    Evaporated,
    /// Position left the grid.
    LeftGrid,
    /// Reached `max_steps`.
    MaxSteps,
    /// Gradient too small to pick a direction (flat or local minimum).
    Stalled,
}

/// Result of advancing a droplet by one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// The droplet passed through `cell` carrying `volume` and moved on from `from`.
    Moved {
        cell: (u32, u32),
        volume: f32,
        from: Vec2,
    },
    Stopped(DropletFate),
}

/// Ephemeral simulation particle. Positions are in cell units; integer
/// coordinates are cell centres.
#[derive(Debug, Clone, PartialEq)]
pub struct Droplet {
    pub position: Vec2,
    pub velocity: Vec2,
    pub volume: f32,
    pub sediment: f32,
    pub steps: u32,
    fate: Option<DropletFate>,
}

/// Height gradient at a fractional position by central differences of bilinear samples.
pub fn gradient(heights: &ScalarGrid, position: Vec2) -> Vec2 {
    let (x, z) = (position.x, position.y);
    let gx = heights.sample_bilinear(x + 1.0, z) - heights.sample_bilinear(x - 1.0, z);
    let gz = heights.sample_bilinear(x, z + 1.0) - heights.sample_bilinear(x, z - 1.0);
    Vec2::new(gx, gz) * 0.5
}

fn in_bounds(heights: &ScalarGrid, p: Vec2) -> bool {
    p.x >= 0.0
        && p.y >= 0.0
        && p.x <= (heights.width() - 1) as f32
        && p.y <= (heights.depth() - 1) as f32
}

impl Droplet {
    pub fn spawn(position: Vec2, volume: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            volume,
            sediment: 0.0,
            steps: 0,
            fate: None,
        }
    }

    pub fn fate(&self) -> Option<DropletFate> {
        self.fate
    }

    fn stop(&mut self, fate: DropletFate) -> Step {
        self.fate = Some(fate);
        Step::Stopped(fate)
    }

    /// Advances one step along the steepest descent.
    ///
    /// The volume carried into the step is attributed to the cell the droplet
    /// occupied before moving. Termination by evaporation, leaving the grid or
    /// the step limit is reported on the following call.
    pub fn step(&mut self, heights: &ScalarGrid, config: &FlowSimulatorConfig) -> Step {
        if let Some(fate) = self.fate {
            return Step::Stopped(fate);
        }
        if heights.is_empty() || !in_bounds(heights, self.position) {
            return self.stop(DropletFate::LeftGrid);
        }
        if self.steps >= config.max_steps {
            return self.stop(DropletFate::MaxSteps);
        }

        let g = gradient(heights, self.position);
        let magnitude = g.length();
        if magnitude <= config.flat_gradient_epsilon || !magnitude.is_finite() {
            return self.stop(DropletFate::Stalled);
        }

        let descent = -g / magnitude;
        let previous = self.velocity.normalize_or_zero();
        let direction = if config.inertia > 0.0 && previous != Vec2::ZERO {
            (previous * config.inertia + descent * (1.0 - config.inertia)).normalize_or_zero()
        } else {
            descent
        };
        if direction == Vec2::ZERO {
            return self.stop(DropletFate::Stalled);
        }

        let from = self.position;
        let cell = (from.x.round() as u32, from.y.round() as u32);
        let volume = self.volume;

        self.velocity = direction * config.step_length;
        self.position += self.velocity;
        self.volume *= 1.0 - config.absorption_rate;
        self.steps += 1;

        if self.volume < config.min_volume_epsilon {
            self.fate = Some(DropletFate::Evaporated);
        } else if !in_bounds(heights, self.position) {
            self.fate = Some(DropletFate::LeftGrid);
        } else if self.steps >= config.max_steps {
            self.fate = Some(DropletFate::MaxSteps);
        }

        Step::Moved { cell, volume, from }
    }
}

/// Adds `amount` to the four cells around `position`, weighted bilinearly.
pub(crate) fn splat_bilinear(grid: &mut ScalarGrid, position: Vec2, amount: f32) {
    if grid.is_empty() {
        return;
    }
    let max_x = (grid.width() - 1) as f32;
    let max_z = (grid.depth() - 1) as f32;
    let px = position.x.clamp(0.0, max_x);
    let pz = position.y.clamp(0.0, max_z);
    let x0 = px.floor() as u32;
    let z0 = pz.floor() as u32;
    let x1 = (x0 + 1).min(grid.width() - 1);
    let z1 = (z0 + 1).min(grid.depth() - 1);
    let tx = px - x0 as f32;
    let tz = pz - z0 as f32;

    let corners = [
        (x0, z0, (1.0 - tx) * (1.0 - tz)),
        (x1, z0, tx * (1.0 - tz)),
        (x0, z1, (1.0 - tx) * tz),
        (x1, z1, tx * tz),
    ];
    for (x, z, w) in corners {
        if w > 0.0 {
            let v = grid.at(x, z);
            grid.set_at(x, z, v + amount * w);
        }
    }
}
