//! Export module for persisting scalar grids.
//!
//! Grids are quantized to 8- or 16-bit samples and written as PNG (1 to 4
//! packed channels) or RAW for game engine imports. Every write goes through a
//! temporary file so a failure never leaves a partial output behind.

mod codec;
mod normal_map;
mod path;
mod png;
mod raw;

pub use codec::{
    decode_channels, dequantize, encode_channels, quantize, BitDepth, EncodedImage, MAX_CHANNELS,
};
pub use normal_map::{
    export_normal_map_png, gradient_at, normal_at, normal_map_channels, NormalMapOptions,
};
pub use path::{sanitize_file_name, sanitize_path, OutputDir};
pub use png::{
    read_png, read_png_grids, write_channels_png, write_grid_png, ImageWriter, PngOptions,
    PngWriter,
};
pub use raw::{expected_file_size, export_raw, RawFormat};
