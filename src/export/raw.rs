//! RAW heightmap export for engine terrain importers.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::codec::{quantize, BitDepth};
use super::path::write_atomically;
use crate::error::Result;
use crate::grid::ScalarGrid;

/// RAW export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RawFormat {
    /// 16-bit unsigned integer, little-endian (Unity default).
    #[default]
    R16LittleEndian,
    /// 16-bit unsigned integer, big-endian.
    R16BigEndian,
    /// 32-bit float, little-endian (unquantized).
    R32Float,
}

/// Exports a normalized grid as a headerless RAW file in row-major order.
///
/// R16 formats clamp to `[0, 1]` and quantize like the PNG codec.
pub fn export_raw(grid: &ScalarGrid, path: &Path, format: RawFormat) -> Result<PathBuf> {
    write_atomically(path, |writer| {
        match format {
            RawFormat::R16LittleEndian => {
                for &v in grid.values() {
                    writer.write_all(&quantize(v, BitDepth::Sixteen).to_le_bytes())?;
                }
            }
            RawFormat::R16BigEndian => {
                for &v in grid.values() {
                    writer.write_all(&quantize(v, BitDepth::Sixteen).to_be_bytes())?;
                }
            }
            RawFormat::R32Float => {
                for &v in grid.values() {
                    writer.write_all(&v.to_le_bytes())?;
                }
            }
        }
        Ok(())
    })
}

/// Returns the expected file size for a RAW export.
pub fn expected_file_size(width: u32, depth: u32, format: RawFormat) -> u64 {
    let cells = (width as u64) * (depth as u64);
    match format {
        RawFormat::R16LittleEndian | RawFormat::R16BigEndian => cells * 2,
        RawFormat::R32Float => cells * 4,
    }
}
