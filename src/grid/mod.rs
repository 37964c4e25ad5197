//! Scalar grid module.
//!
//! Provides the normalized 2D buffer shared by heightfields, flow maps and masks.

mod scalar;

pub use scalar::ScalarGrid;
