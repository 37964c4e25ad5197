//! Output path handling: filename sanitization and all-or-nothing file writes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, TerrainError};

const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Removes characters that are invalid in a filename on common host filesystems.
///
/// Trailing dots and spaces are stripped as well. An empty result becomes `"unnamed"`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && !INVALID_FILENAME_CHARS.contains(c))
        .collect();
    let trimmed = cleaned.trim().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns `path` with its final component sanitized. Directory components are kept.
pub fn sanitize_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sanitized = sanitize_file_name(&name);
    match path.parent() {
        Some(parent) => parent.join(sanitized),
        None => PathBuf::from(sanitized),
    }
}

/// Resolves caller-supplied file names against a configurable output directory.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds `root/<sanitized name>.<extension>`.
    pub fn file(&self, name: &str, extension: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", sanitize_file_name(name), extension))
    }
}

/// Writes a file through a temporary sibling that is renamed into place only
/// after `write` succeeds and the buffer is flushed.
///
/// The temporary file is removed when dropped, so a failed write never leaves a
/// partial file at the destination. Returns the sanitized path written.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<PathBuf>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> std::result::Result<(), image::ImageError>,
{
    let path = sanitize_path(path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| TerrainError::io(&dir, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| TerrainError::io(&path, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer).map_err(|e| match e {
            image::ImageError::IoError(io) => TerrainError::io(&path, io),
            other => TerrainError::image(&path, other),
        })?;
        writer.flush().map_err(|e| TerrainError::io(&path, e))?;
    }
    tmp.persist(&path)
        .map_err(|e| TerrainError::io(&path, e.error))?;

    tracing::debug!(path = %path.display(), "wrote output file");
    Ok(path)
}
