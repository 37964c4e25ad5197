//! Droplet-based flow accumulation and erosion.
//!
//! Droplets spawn on the heightfield, follow the steepest descent and deposit
//! their current water volume into the flow map at every cell they pass
//! through. Runs are deterministic for a fixed heightfield, configuration and
//! seed. Parallel runs split the droplets into partitions with private flow
//! maps merged in partition order, so they reproduce per partition count.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::config::{FlowSimulatorConfig, SpawnOrder};
use super::droplet::{splat_bilinear, Droplet, DropletFate, Step};
use crate::error::{Result, TerrainError};
use crate::grid::ScalarGrid;
use crate::task::{check_cancelled, Progress, Silent, TaskMonitor};

/// How often (in droplets) progress is reported and cancellation polled.
const REPORT_INTERVAL: usize = 1024;

/// Counters describing how droplets terminated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowStats {
    pub droplets: usize,
    pub total_steps: u64,
    pub evaporated: usize,
    pub left_grid: usize,
    pub max_steps: usize,
    pub stalled: usize,
}

impl FlowStats {
    fn record(&mut self, droplet: &Droplet) {
        self.droplets += 1;
        self.total_steps += droplet.steps as u64;
        match droplet.fate() {
            Some(DropletFate::Evaporated) => self.evaporated += 1,
            Some(DropletFate::LeftGrid) => self.left_grid += 1,
            Some(DropletFate::MaxSteps) => self.max_steps += 1,
            Some(DropletFate::Stalled) | None => self.stalled += 1,
        }
    }

    fn merge(&mut self, other: &FlowStats) {
        self.droplets += other.droplets;
        self.total_steps += other.total_steps;
        self.evaporated += other.evaporated;
        self.left_grid += other.left_grid;
        self.max_steps += other.max_steps;
        self.stalled += other.stalled;
    }
}

/// Output of a simulation pass.
#[derive(Debug, Clone)]
pub struct FlowRun {
    /// Unnormalized flow intensity, same dimensions as the heightfield.
    pub flow: ScalarGrid,
    pub stats: FlowStats,
}

/// Computes water-flow intensity maps from heightfields.
#[derive(Debug, Clone)]
pub struct FlowSimulator {
    config: FlowSimulatorConfig,
}

impl FlowSimulator {
    pub fn new(config: FlowSimulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FlowSimulatorConfig {
        &self.config
    }

    fn spawn_position<R: Rng + ?Sized>(&self, heights: &ScalarGrid, index: usize, rng: &mut R) -> Vec2 {
        let (w, d) = heights.dimensions();
        match self.config.spawn_order {
            SpawnOrder::Scan => {
                let x = index % w as usize;
                let z = (index / w as usize) % d as usize;
                Vec2::new(x as f32, z as f32)
            }
            SpawnOrder::Random => Vec2::new(
                rng.random_range(0.0..=(w - 1) as f32),
                rng.random_range(0.0..=(d - 1) as f32),
            ),
        }
    }

    /// Simulates droplets `range` into `flow`, drawing spawn points from `rng`.
    fn run_range<R: Rng + ?Sized>(
        &self,
        heights: &ScalarGrid,
        range: std::ops::Range<usize>,
        rng: &mut R,
        flow: &mut ScalarGrid,
        monitor: &dyn TaskMonitor,
        total: usize,
    ) -> Result<FlowStats> {
        let mut stats = FlowStats::default();
        for (n, index) in range.enumerate() {
            if n % REPORT_INTERVAL == 0 {
                check_cancelled(monitor)?;
                monitor.on_progress(Progress {
                    stage: "flow",
                    completed: index,
                    total,
                });
            }

            let start = self.spawn_position(heights, index, rng);
            let mut droplet = Droplet::spawn(start, self.config.droplet_volume);
            while let Step::Moved { cell, volume, .. } = droplet.step(heights, &self.config) {
                let i = flow.index_of(cell.0, cell.1);
                flow.values_mut()[i] += volume;
            }
            stats.record(&droplet);
        }
        Ok(stats)
    }

    /// Runs the simulation single-threaded with an RNG seeded from the config.
    pub fn simulate(&self, heights: &ScalarGrid) -> Result<ScalarGrid> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        Ok(self.run(heights, &mut rng, &Silent)?.flow)
    }

    /// Runs the simulation single-threaded with an injected RNG.
    ///
    /// This is the reference mode: identical inputs and RNG state produce
    /// bit-identical flow maps.
    pub fn run<R: Rng + ?Sized>(
        &self,
        heights: &ScalarGrid,
        rng: &mut R,
        monitor: &dyn TaskMonitor,
    ) -> Result<FlowRun> {
        let (w, d) = heights.dimensions();
        let mut flow = ScalarGrid::new(w, d);
        if heights.is_empty() {
            return Ok(FlowRun { flow, stats: FlowStats::default() });
        }
        let total = self.config.droplets_for(w, d);
        let stats = self.run_range(heights, 0..total, rng, &mut flow, monitor, total)?;
        monitor.on_progress(Progress { stage: "flow", completed: total, total });
        log_stats(&stats, w, d);
        Ok(FlowRun { flow, stats })
    }

    /// Runs the simulation across `partitions` rayon workers.
    ///
    /// Partition `p` simulates a contiguous block of droplets with an RNG
    /// seeded `seed + p` into a private flow map; maps are summed in partition
    /// order. With one partition the result equals [`FlowSimulator::simulate`].
    pub fn simulate_parallel(
        &self,
        heights: &ScalarGrid,
        partitions: usize,
        monitor: &dyn TaskMonitor,
    ) -> Result<FlowRun> {
        if partitions == 0 {
            return Err(TerrainError::InvalidConfig("partitions must be positive".into()));
        }
        let (w, d) = heights.dimensions();
        if heights.is_empty() {
            return Ok(FlowRun { flow: ScalarGrid::new(w, d), stats: FlowStats::default() });
        }
        let total = self.config.droplets_for(w, d);
        let chunk = total.div_ceil(partitions);

        let parts: Vec<(ScalarGrid, FlowStats)> = (0..partitions)
            .into_par_iter()
            .map(|p| {
                let start = (p * chunk).min(total);
                let end = ((p + 1) * chunk).min(total);
                let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(p as u64));
                let mut flow = ScalarGrid::new(w, d);
                let stats = self.run_range(heights, start..end, &mut rng, &mut flow, monitor, total)?;
                Ok((flow, stats))
            })
            .collect::<Result<_>>()?;

        let mut flow = ScalarGrid::new(w, d);
        let mut stats = FlowStats::default();
        for (part, part_stats) in &parts {
            flow.accumulate(part)?;
            stats.merge(part_stats);
        }
        monitor.on_progress(Progress { stage: "flow", completed: total, total });
        log_stats(&stats, w, d);
        Ok(FlowRun { flow, stats })
    }

    /// Runs the droplet walk while carrying sediment, eroding and depositing
    /// into `heights` in place. Returns the flow map of the same pass.
    ///
    /// Droplets read the heightfield as it is being modified, so this mode is
    /// single-threaded only.
    pub fn erode<R: Rng + ?Sized>(
        &self,
        heights: &mut ScalarGrid,
        rng: &mut R,
        monitor: &dyn TaskMonitor,
    ) -> Result<FlowRun> {
        let (w, d) = heights.dimensions();
        let mut flow = ScalarGrid::new(w, d);
        let mut stats = FlowStats::default();
        if heights.is_empty() {
            return Ok(FlowRun { flow, stats });
        }
        let sediment = &self.config.sediment;
        let total = self.config.droplets_for(w, d);

        for index in 0..total {
            if index % REPORT_INTERVAL == 0 {
                check_cancelled(monitor)?;
                monitor.on_progress(Progress { stage: "erosion", completed: index, total });
            }

            let start = self.spawn_position(heights, index, rng);
            let mut droplet = Droplet::spawn(start, self.config.droplet_volume);
            let mut last_inside = start;

            loop {
                let h_old = heights.sample_bilinear(droplet.position.x, droplet.position.y);
                let Step::Moved { cell, volume, from } = droplet.step(heights, &self.config) else {
                    break;
                };
                let i = flow.index_of(cell.0, cell.1);
                flow.values_mut()[i] += volume;

                if droplet.fate() == Some(DropletFate::LeftGrid) {
                    break;
                }
                last_inside = droplet.position;

                let h_new = heights.sample_bilinear(droplet.position.x, droplet.position.y);
                let dh = h_new - h_old;
                let speed = droplet.velocity.length();
                let capacity = sediment.carrying_capacity(speed, -dh, volume);

                if dh > 0.0 || droplet.sediment > capacity {
                    // Fill the pit uphill, or drop the excess.
                    let amount = if dh > 0.0 {
                        dh.min(droplet.sediment)
                    } else {
                        (droplet.sediment - capacity) * sediment.deposition_rate
                    };
                    droplet.sediment -= amount;
                    splat_bilinear(heights, from, amount);
                } else {
                    let amount = ((capacity - droplet.sediment) * sediment.erosion_rate).min(-dh);
                    droplet.sediment += amount;
                    splat_bilinear(heights, from, -amount);
                }
            }

            if droplet.sediment > 0.0 && droplet.fate() != Some(DropletFate::LeftGrid) {
                splat_bilinear(heights, last_inside, droplet.sediment);
                droplet.sediment = 0.0;
            }
            stats.record(&droplet);
        }

        monitor.on_progress(Progress { stage: "erosion", completed: total, total });
        log_stats(&stats, w, d);
        Ok(FlowRun { flow, stats })
    }
}

fn log_stats(stats: &FlowStats, width: u32, depth: u32) {
    tracing::info!(
        width,
        depth,
        droplets = stats.droplets,
        total_steps = stats.total_steps,
        stalled = stats.stalled,
        left_grid = stats.left_grid,
        evaporated = stats.evaporated,
        max_steps = stats.max_steps,
        "flow simulation complete"
    );
}
