//! Droplet-based hydraulic flow simulation.
//!
//! Water droplets follow the steepest descent over a heightfield and
//! accumulate a flow-intensity map; an optional sediment pass erodes the
//! heightfield along the same paths.

mod config;
mod droplet;
mod flow;

pub use config::{FlowSimulatorConfig, SedimentConfig, SpawnOrder};
pub use droplet::{gradient, Droplet, DropletFate, Step};
pub use flow::{FlowRun, FlowSimulator, FlowStats};
