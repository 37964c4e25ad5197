//! PNG image writing and reading for scalar grids.

use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use super::codec::{decode_channels, encode_channels, BitDepth, EncodedImage};
use super::path::write_atomically;
use crate::error::{Result, TerrainError};
use crate::grid::ScalarGrid;

/// Options for PNG export.
#[derive(Debug, Clone, Copy)]
pub struct PngOptions {
    /// Bits per channel.
    pub bit_depth: BitDepth,
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            bit_depth: BitDepth::Sixteen,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngOptions {
    pub fn with_bit_depth(bit_depth: BitDepth) -> Self {
        Self {
            bit_depth,
            ..Default::default()
        }
    }
}

/// Capability for persisting an encoded image.
pub trait ImageWriter {
    /// Writes `image` to `path`, returning the (sanitized) path actually written.
    fn write_image(&self, image: &EncodedImage, path: &Path) -> Result<PathBuf>;
}

/// Writes PNG files with the `image` crate encoder.
#[derive(Debug, Clone, Copy)]
pub struct PngWriter {
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngWriter {
    fn default() -> Self {
        Self::from_options(&PngOptions::default())
    }
}

impl PngWriter {
    pub fn from_options(options: &PngOptions) -> Self {
        Self {
            compression: options.compression,
            filter: options.filter,
        }
    }
}

fn color_type(channels: u8, depth: BitDepth) -> Option<ExtendedColorType> {
    let color = match (channels, depth) {
        (1, BitDepth::Eight) => ExtendedColorType::L8,
        (2, BitDepth::Eight) => ExtendedColorType::La8,
        (3, BitDepth::Eight) => ExtendedColorType::Rgb8,
        (4, BitDepth::Eight) => ExtendedColorType::Rgba8,
        (1, BitDepth::Sixteen) => ExtendedColorType::L16,
        (2, BitDepth::Sixteen) => ExtendedColorType::La16,
        (3, BitDepth::Sixteen) => ExtendedColorType::Rgb16,
        (4, BitDepth::Sixteen) => ExtendedColorType::Rgba16,
        _ => return None,
    };
    Some(color)
}

impl ImageWriter for PngWriter {
    fn write_image(&self, image: &EncodedImage, path: &Path) -> Result<PathBuf> {
        let color = color_type(image.channels, image.bit_depth).ok_or_else(|| {
            TerrainError::InvalidConfig(format!("unsupported channel count {}", image.channels))
        })?;

        // Narrow 8-bit samples before touching the filesystem.
        let bytes_u8;
        let bytes: &[u8] = match image.bit_depth {
            BitDepth::Eight => {
                bytes_u8 = image.samples_u8();
                &bytes_u8
            }
            BitDepth::Sixteen => bytemuck::cast_slice(image.samples.as_slice()),
        };

        write_atomically(path, |writer| {
            let encoder = PngEncoder::new_with_quality(writer, self.compression, self.filter);
            encoder.write_image(bytes, image.width, image.height, color)
        })
    }
}

/// Exports a single grid as a grayscale PNG.
pub fn write_grid_png(grid: &ScalarGrid, path: &Path, options: &PngOptions) -> Result<PathBuf> {
    write_channels_png(&[grid], path, options)
}

/// Exports up to four equally sized grids packed as L/LA/RGB/RGBA channels.
pub fn write_channels_png(
    channels: &[&ScalarGrid],
    path: &Path,
    options: &PngOptions,
) -> Result<PathBuf> {
    let image = encode_channels(channels, options.bit_depth)?;
    PngWriter::from_options(options).write_image(&image, path)
}

/// Reads an 8- or 16-bit PNG into interleaved samples.
pub fn read_png(path: &Path) -> Result<EncodedImage> {
    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => TerrainError::io(path, io),
        other => TerrainError::image(path, other),
    })?;

    let color = img.color();
    let channels = color.channel_count();
    let sixteen = color.bytes_per_pixel() / channels >= 2;
    let (width, height) = (img.width(), img.height());
    let widen = |raw: Vec<u8>| raw.into_iter().map(u16::from).collect::<Vec<u16>>();

    let samples = match (channels, sixteen) {
        (1, true) => img.to_luma16().into_raw(),
        (1, false) => widen(img.to_luma8().into_raw()),
        (2, true) => img.to_luma_alpha16().into_raw(),
        (2, false) => widen(img.to_luma_alpha8().into_raw()),
        (3, true) => img.to_rgb16().into_raw(),
        (3, false) => widen(img.to_rgb8().into_raw()),
        (_, true) => img.to_rgba16().into_raw(),
        (_, false) => widen(img.to_rgba8().into_raw()),
    };

    Ok(EncodedImage {
        width,
        height,
        channels: channels.min(4),
        bit_depth: if sixteen { BitDepth::Sixteen } else { BitDepth::Eight },
        samples,
    })
}

/// Reads a PNG and returns one normalized grid per channel.
pub fn read_png_grids(path: &Path) -> Result<Vec<ScalarGrid>> {
    decode_channels(&read_png(path)?)
}
