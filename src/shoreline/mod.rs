//! Shoreline proximity masks around a water line.

mod config;
mod mask;

pub use config::ShorelineMaskerConfig;
pub use mask::{CellKind, ShorelineMasker};
