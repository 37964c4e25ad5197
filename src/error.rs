//! Error taxonomy shared by every terrain operation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, processing or exporting terrain data.
#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("World grid has no active tile surface")]
    NoActiveSurface,
    #[error("Dimension mismatch: expected {}x{}, found {}x{}", .expected.0, .expected.1, .found.0, .found.1)]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("Cell ({x}, {z}) is outside the {width}x{depth} grid")]
    OutOfBounds { x: u32, z: u32, width: u32, depth: u32 },
    #[error("Two tiles occupy world grid slot (column {column}, row {row})")]
    OverlappingTiles { column: u32, row: u32 },
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Image encoding error at {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to parse configuration {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Operation cancelled")]
    Cancelled,
}

impl TerrainError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TerrainError>;
