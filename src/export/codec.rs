//! Quantization and channel packing for scalar grids.
//!
//! A value `v` in `[0, 1]` maps to `round(v * (2^bits - 1))`; decoding divides by
//! the same maximum, so a round trip is exact up to half a quantization step.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::grid::ScalarGrid;

/// Maximum number of grids that can be packed into one image (RGBA).
pub const MAX_CHANNELS: usize = 4;

/// Bits per channel of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitDepth {
    Eight,
    #[default]
    Sixteen,
}

impl BitDepth {
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    /// Largest representable sample, `2^bits - 1`.
    pub fn max_value(self) -> u16 {
        match self {
            BitDepth::Eight => u8::MAX as u16,
            BitDepth::Sixteen => u16::MAX,
        }
    }
}

/// Maps a normalized value to an integer sample. Values outside `[0, 1]` are clamped; NaN maps to 0.
#[inline]
pub fn quantize(value: f32, depth: BitDepth) -> u16 {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    (v * depth.max_value() as f32).round() as u16
}

/// Inverse of [`quantize`].
#[inline]
pub fn dequantize(sample: u16, depth: BitDepth) -> f32 {
    sample as f32 / depth.max_value() as f32
}

/// Interleaved integer samples ready for an image writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub bit_depth: BitDepth,
    /// `width * height * channels` samples, pixel-interleaved, row-major.
    pub samples: Vec<u16>,
}

impl EncodedImage {
    /// Samples narrowed to bytes. Only meaningful for 8-bit images.
    pub fn samples_u8(&self) -> Vec<u8> {
        self.samples.iter().map(|&s| s.min(u8::MAX as u16) as u8).collect()
    }
}

/// Packs 1 to 4 equally sized grids into one interleaved image.
pub fn encode_channels(channels: &[&ScalarGrid], depth: BitDepth) -> Result<EncodedImage> {
    let first = match channels.first() {
        Some(first) if channels.len() <= MAX_CHANNELS => *first,
        _ => {
            return Err(TerrainError::InvalidConfig(format!(
                "cannot encode {} channels (expected 1 to {})",
                channels.len(),
                MAX_CHANNELS
            )))
        }
    };
    let dims = first.dimensions();
    if let Some(other) = channels.iter().find(|g| g.dimensions() != dims) {
        return Err(TerrainError::DimensionMismatch {
            expected: dims,
            found: other.dimensions(),
        });
    }

    let count = channels.len();
    let mut samples = vec![0u16; first.len() * count];
    for (c, grid) in channels.iter().enumerate() {
        for (i, &v) in grid.values().iter().enumerate() {
            samples[i * count + c] = quantize(v, depth);
        }
    }

    Ok(EncodedImage {
        width: dims.0,
        height: dims.1,
        channels: count as u8,
        bit_depth: depth,
        samples,
    })
}

/// Unpacks an interleaved image into one grid per channel.
pub fn decode_channels(image: &EncodedImage) -> Result<Vec<ScalarGrid>> {
    let count = image.channels as usize;
    if count == 0 || count > MAX_CHANNELS {
        return Err(TerrainError::InvalidConfig(format!(
            "cannot decode {} channels (expected 1 to {})",
            count, MAX_CHANNELS
        )));
    }
    let pixels = (image.width as usize) * (image.height as usize);
    if image.samples.len() != pixels * count {
        return Err(TerrainError::DimensionMismatch {
            expected: (image.width, image.height),
            found: ((image.samples.len() / count) as u32, 1),
        });
    }

    (0..count)
        .map(|c| {
            let values = (0..pixels)
                .map(|i| dequantize(image.samples[i * count + c], image.bit_depth))
                .collect();
            ScalarGrid::from_values(image.width, image.height, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, depth: u32) -> ScalarGrid {
        let n = (width * depth - 1).max(1) as f32;
        let values = (0..width * depth).map(|i| i as f32 / n).collect();
        ScalarGrid::from_values(width, depth, values).unwrap()
    }

    #[test]
    fn test_quantize_endpoints() {
        assert_eq!(quantize(0.0, BitDepth::Sixteen), 0);
        assert_eq!(quantize(1.0, BitDepth::Sixteen), 65535);
        assert_eq!(quantize(1.0, BitDepth::Eight), 255);
        assert_eq!(quantize(0.5, BitDepth::Eight), 128);
        assert_eq!(quantize(-3.0, BitDepth::Eight), 0);
        assert_eq!(quantize(f32::NAN, BitDepth::Eight), 0);
    }

    #[test]
    fn test_sixteen_bit_round_trip_within_one_step() {
        let grid = gradient(37, 11);
        let image = encode_channels(&[&grid], BitDepth::Sixteen).unwrap();
        let decoded = decode_channels(&image).unwrap();
        for (a, b) in grid.values().iter().zip(decoded[0].values()) {
            assert!((a - b).abs() <= 1.0 / 65535.0);
        }
    }

    #[test]
    fn test_eight_bit_round_trip_within_one_step() {
        let grid = gradient(16, 16);
        let image = encode_channels(&[&grid], BitDepth::Eight).unwrap();
        let decoded = decode_channels(&image).unwrap();
        for (a, b) in grid.values().iter().zip(decoded[0].values()) {
            assert!((a - b).abs() <= 1.0 / 255.0);
        }
    }

    #[test]
    fn test_channels_are_interleaved() {
        let r = ScalarGrid::filled(2, 1, 1.0);
        let g = ScalarGrid::filled(2, 1, 0.0);
        let image = encode_channels(&[&r, &g], BitDepth::Eight).unwrap();
        assert_eq!(image.channels, 2);
        assert_eq!(image.samples, vec![255, 0, 255, 0]);
    }

    #[test]
    fn test_rejects_bad_channel_sets() {
        let a = ScalarGrid::new(4, 4);
        let b = ScalarGrid::new(4, 5);
        assert!(matches!(
            encode_channels(&[&a, &b], BitDepth::Eight),
            Err(TerrainError::DimensionMismatch { .. })
        ));
        assert!(encode_channels(&[], BitDepth::Eight).is_err());
        assert!(encode_channels(&[&a, &a, &a, &a, &a], BitDepth::Eight).is_err());
    }
}
